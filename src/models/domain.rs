use serde::{Deserialize, Serialize};

/// Stage value meaning "not currently completing a profile"
pub const PROFILE_STAGE_NONE: i32 = -1;

/// Last step of the profile completion sequence
pub const MAX_PROFILE_STAGE: i32 = 5;

/// A registered participant of the introduction service
///
/// `preference_flag` is `true` for male and `false` for female. Candidates are
/// always drawn from the opposite flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub preference_flag: bool,
    pub age: i32,
    pub description: String,
    pub city: String,
    pub photo_ref: String,
    pub registered: bool,
    pub stage: i32,
    pub channel_ref: i64,
}

impl Participant {
    /// Blank participant as created on first contact
    pub fn new(id: impl Into<String>, channel_ref: i64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            preference_flag: false,
            age: 0,
            description: String::new(),
            city: String::new(),
            photo_ref: String::new(),
            registered: false,
            stage: PROFILE_STAGE_NONE,
            channel_ref,
        }
    }

    pub fn has_photo(&self) -> bool {
        !self.photo_ref.is_empty()
    }

    /// True while the participant is answering one of the six profile steps
    pub fn is_completing_profile(&self) -> bool {
        (0..=MAX_PROFILE_STAGE).contains(&self.stage)
    }

    pub fn sex(&self) -> Sex {
        Sex::from_flag(self.preference_flag)
    }
}

/// Directed evaluation edge `from -> to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evaluation {
    pub id: i64,
    pub from_id: String,
    pub to_id: String,
    pub value: bool,
}

impl Evaluation {
    /// New, not yet persisted evaluation (the store assigns `id`)
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, value: bool) -> Self {
        Self {
            id: 0,
            from_id: from_id.into(),
            to_id: to_id.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            Sex::Male
        } else {
            Sex::Female
        }
    }

    pub fn flag(self) -> bool {
        matches!(self, Sex::Male)
    }
}

/// Media attached to a profile answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    /// Nothing was uploaded with the answer
    NoInput,
    /// Keep the photo the participant already has
    ReuseExisting,
    /// Freshly uploaded media reference
    NewValue(String),
}

impl MediaInput {
    pub fn from_upload(photo_ref: Option<String>) -> Self {
        match photo_ref {
            Some(r) if !r.is_empty() => MediaInput::NewValue(r),
            _ => MediaInput::NoInput,
        }
    }
}
