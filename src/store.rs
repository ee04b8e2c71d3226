use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed agenda slots, in display order
pub const TIME_SLOTS: [&str; 6] = [
    "9:00 AM - 10:00 AM",
    "10:15 AM - 11:15 AM",
    "11:30 AM - 12:30 PM",
    "1:30 PM - 2:30 PM",
    "2:45 PM - 3:45 PM",
    "4:00 PM - 5:00 PM",
];

const MIN_DESCRIPTION_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Track {
    Design,
    Development,
    Product,
    Leadership,
}

impl Track {
    pub const ALL: [Track; 4] = [
        Track::Design,
        Track::Development,
        Track::Product,
        Track::Leadership,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Design => "Design",
            Track::Development => "Development",
            Track::Product => "Product",
            Track::Leadership => "Leadership",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown track: {0}")]
pub struct UnknownTrack(pub String);

impl FromStr for Track {
    type Err = UnknownTrack;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Track::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTrack(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Proposed,
    Scheduled,
}

/// Where and when a scheduled session happens. Time and location only ever
/// travel together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub time: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "SessionRecord")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub presenter: String,
    pub description: String,
    pub track: Track,
    pub votes: u32,
    slot: Option<Slot>,
}

impl Session {
    pub fn status(&self) -> Status {
        match self.slot {
            Some(_) => Status::Scheduled,
            None => Status::Proposed,
        }
    }

    pub fn slot(&self) -> Option<&Slot> {
        self.slot.as_ref()
    }
}

/// Wire shape of a session
#[derive(Serialize)]
struct SessionRecord {
    id: String,
    title: String,
    presenter: String,
    description: String,
    track: Track,
    votes: u32,
    status: Status,
    time: Option<String>,
    location: Option<String>,
}

impl From<Session> for SessionRecord {
    fn from(session: Session) -> Self {
        let status = session.status();
        let (time, location) = match session.slot {
            Some(slot) => (Some(slot.time), Some(slot.location)),
            None => (None, None),
        };
        SessionRecord {
            id: session.id,
            title: session.title,
            presenter: session.presenter,
            description: session.description,
            track: session.track,
            votes: session.votes,
            status,
            time,
            location,
        }
    }
}

/// Submission form body. Fields are optional so missing ones can be reported
/// alongside the other validation failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewSession {
    pub title: Option<String>,
    pub presenter: Option<String>,
    pub track: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("invalid session: {}", .0.values().cloned().collect::<Vec<_>>().join(", "))]
    Invalid(BTreeMap<&'static str, String>),
}

/// Immutable snapshot of every session. Transitions return a new snapshot
/// and leave `self` untouched.
#[derive(Debug, Clone, Default)]
pub struct Sessions {
    sessions: Vec<Session>,
}

impl Sessions {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }

    pub fn all(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Highest voted first; ties keep submission order
    pub fn popular(&self, limit: usize) -> Vec<&Session> {
        let mut sorted: Vec<&Session> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| b.votes.cmp(&a.votes));
        sorted.truncate(limit);
        sorted
    }

    pub fn by_status(&self, status: Status) -> Vec<&Session> {
        self.sessions.iter().filter(|s| s.status() == status).collect()
    }

    pub fn agenda(&self) -> Agenda<'_> {
        let scheduled = self.by_status(Status::Scheduled);

        let mut times: Vec<&str> = TIME_SLOTS.to_vec();
        for session in scheduled.iter().copied() {
            if let Some(slot) = session.slot() {
                if !times.contains(&slot.time.as_str()) {
                    times.push(&slot.time);
                }
            }
        }

        let by_time = times
            .into_iter()
            .map(|time| {
                let sessions: Vec<&Session> = scheduled
                    .iter()
                    .copied()
                    .filter(|s| s.slot().map(|slot| slot.time.as_str()) == Some(time))
                    .collect();
                (time, sessions)
            })
            .filter(|(_, sessions)| !sessions.is_empty())
            .collect();

        let by_track = Track::ALL
            .into_iter()
            .map(|track| {
                let sessions: Vec<&Session> = scheduled
                    .iter()
                    .copied()
                    .filter(|s| s.track == track)
                    .collect();
                (track, sessions)
            })
            .filter(|(_, sessions)| !sessions.is_empty())
            .collect();

        Agenda { by_time, by_track }
    }

    /// Validate a submission and append it as a proposed session with one vote
    pub fn add(&self, new: NewSession, id_hint: i64) -> Result<(Sessions, Session), StoreError> {
        let (title, presenter, track, description) = validate(new)?;

        let mut candidate = id_hint;
        while self.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }

        let session = Session {
            id: candidate.to_string(),
            title,
            presenter,
            description,
            track,
            votes: 1,
            slot: None,
        };

        let mut sessions = self.sessions.clone();
        sessions.push(session.clone());
        Ok((Sessions { sessions }, session))
    }

    pub fn upvote(&self, id: &str) -> Result<Sessions, StoreError> {
        self.update(id, |session| session.votes += 1)
    }

    /// Schedule (or reschedule) a session. Time and location are both required.
    pub fn schedule(&self, id: &str, time: &str, location: &str) -> Result<Sessions, StoreError> {
        let mut errors = BTreeMap::new();
        if time.trim().is_empty() {
            errors.insert("time", "Time is required".to_string());
        }
        if location.trim().is_empty() {
            errors.insert("location", "Location is required".to_string());
        }
        if !errors.is_empty() {
            return Err(StoreError::Invalid(errors));
        }

        let slot = Slot {
            time: time.trim().to_string(),
            location: location.trim().to_string(),
        };
        self.update(id, move |session| session.slot = Some(slot))
    }

    fn update(&self, id: &str, change: impl FnOnce(&mut Session)) -> Result<Sessions, StoreError> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut sessions = self.sessions.clone();
        change(&mut sessions[index]);
        Ok(Sessions { sessions })
    }
}

fn validate(new: NewSession) -> Result<(String, String, Track, String), StoreError> {
    let mut errors = BTreeMap::new();

    let title = new.title.unwrap_or_default().trim().to_string();
    if title.is_empty() {
        errors.insert("title", "Title is required".to_string());
    }

    let presenter = new.presenter.unwrap_or_default().trim().to_string();
    if presenter.is_empty() {
        errors.insert("presenter", "Presenter name is required".to_string());
    }

    let track = match new.track.as_deref().filter(|t| !t.is_empty()) {
        None => {
            errors.insert("track", "Track is required".to_string());
            None
        }
        Some(name) => match name.parse::<Track>() {
            Ok(track) => Some(track),
            Err(e) => {
                errors.insert("track", e.to_string());
                None
            }
        },
    };

    // blank check on the trimmed text, length check on the text as typed
    let raw_description = new.description.unwrap_or_default();
    let description = raw_description.trim().to_string();
    if description.is_empty() {
        errors.insert("description", "Description is required".to_string());
    } else if raw_description.chars().count() < MIN_DESCRIPTION_LEN {
        errors.insert(
            "description",
            format!("Description must be at least {} characters", MIN_DESCRIPTION_LEN),
        );
    }

    match track {
        Some(track) if errors.is_empty() => Ok((title, presenter, track, description)),
        _ => Err(StoreError::Invalid(errors)),
    }
}

/// Scheduled sessions grouped for display
#[derive(Debug)]
pub struct Agenda<'a> {
    pub by_time: Vec<(&'a str, Vec<&'a Session>)>,
    pub by_track: Vec<(Track, Vec<&'a Session>)>,
}

impl Agenda<'_> {
    pub fn is_empty(&self) -> bool {
        self.by_time.is_empty()
    }
}

fn seed(
    id: &str,
    title: &str,
    presenter: &str,
    description: &str,
    track: Track,
    votes: u32,
    slot: Option<(&str, &str)>,
) -> Session {
    Session {
        id: id.to_string(),
        title: title.to_string(),
        presenter: presenter.to_string(),
        description: description.to_string(),
        track,
        votes,
        slot: slot.map(|(time, location)| Slot {
            time: time.to_string(),
            location: location.to_string(),
        }),
    }
}

/// Sessions the board starts with
pub fn seed_sessions() -> Sessions {
    Sessions::new(vec![
        seed(
            "1",
            "Building Accessible Web Applications",
            "Alex Johnson",
            "Learn how to create web applications that are accessible to everyone. We'll cover ARIA attributes, keyboard navigation, and testing tools.",
            Track::Development,
            24,
            Some((TIME_SLOTS[0], "Room A")),
        ),
        seed(
            "2",
            "Design Systems at Scale",
            "Maya Patel",
            "How to build and maintain design systems that scale across multiple products and teams. We'll share our experience and best practices.",
            Track::Design,
            18,
            Some((TIME_SLOTS[1], "Room B")),
        ),
        seed(
            "3",
            "Product Discovery Techniques",
            "Carlos Rodriguez",
            "Effective techniques for product discovery that help you build the right thing. We'll cover user interviews, prototyping, and validation methods.",
            Track::Product,
            15,
            Some((TIME_SLOTS[2], "Room C")),
        ),
        seed(
            "4",
            "Microservices Architecture Patterns",
            "Samantha Lee",
            "Explore common patterns and anti-patterns in microservices architecture. Learn from our mistakes and successes.",
            Track::Development,
            12,
            None,
        ),
        seed(
            "5",
            "Leading Engineering Teams",
            "David Chen",
            "Strategies for leading and growing engineering teams. We'll discuss hiring, mentoring, and creating a positive team culture.",
            Track::Leadership,
            10,
            None,
        ),
        seed(
            "6",
            "React Performance Optimization",
            "Priya Sharma",
            "Deep dive into React performance optimization techniques. Learn how to identify and fix performance bottlenecks in your React applications.",
            Track::Development,
            9,
            None,
        ),
        seed(
            "7",
            "User Research on a Budget",
            "James Wilson",
            "How to conduct effective user research with limited resources. We'll share practical tips and tools that won't break the bank.",
            Track::Design,
            8,
            None,
        ),
        seed(
            "8",
            "Building a Product Roadmap",
            "Elena Gonzalez",
            "A step-by-step guide to creating and communicating a product roadmap that aligns stakeholders and guides development.",
            Track::Product,
            7,
            Some((TIME_SLOTS[3], "Room A")),
        ),
        seed(
            "9",
            "Inclusive Design Principles",
            "Omar Hassan",
            "Learn how to design products that work for diverse users. We'll cover inclusive design principles and practical implementation strategies.",
            Track::Design,
            6,
            Some((TIME_SLOTS[4], "Room B")),
        ),
        seed(
            "10",
            "DevOps Best Practices",
            "Lina Kim",
            "Essential DevOps practices for modern development teams. We'll cover CI/CD, infrastructure as code, and monitoring.",
            Track::Development,
            5,
            Some((TIME_SLOTS[5], "Room C")),
        ),
    ])
}
