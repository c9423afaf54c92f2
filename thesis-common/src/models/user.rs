//! Participants: students, lecturers, admins

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Role of an authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Student,
    Lecture,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "Student",
            UserRole::Lecture => "Lecture",
            UserRole::Admin => "Admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(UserRole::Student),
            "Lecture" => Ok(UserRole::Lecture),
            "Admin" => Ok(UserRole::Admin),
            other => Err(Error::InvalidInput(format!("unknown user role: {}", other))),
        }
    }
}

/// Author type of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    Student,
    Lecture,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Student => "Student",
            UserType::Lecture => "Lecture",
        }
    }
}

impl FromStr for UserType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(UserType::Student),
            "Lecture" => Ok(UserType::Lecture),
            other => Err(Error::InvalidInput(format!("unknown user type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub nim: String,
    pub email: String,
    pub department: String,
    pub year: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: Uuid,
    pub name: String,
    pub nidn: String,
    pub email: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: &str, nim: &str, email: &str, department: &str, year: &str) -> Self {
        Self {
            id: crate::uuid_utils::generate(),
            name: name.to_string(),
            nim: nim.to_string(),
            email: email.to_string(),
            department: department.to_string(),
            year: year.to_string(),
            created_at: crate::time::now(),
        }
    }
}

impl Lecture {
    pub fn new(name: &str, nidn: &str, email: &str, department: &str) -> Self {
        Self {
            id: crate::uuid_utils::generate(),
            name: name.to_string(),
            nidn: nidn.to_string(),
            email: email.to_string(),
            department: department.to_string(),
            created_at: crate::time::now(),
        }
    }
}

impl Admin {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: crate::uuid_utils::generate(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: crate::time::now(),
        }
    }
}
