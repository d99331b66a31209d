//! Navigation paths of the chat front end.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Patients,
    PatientDetail(String),
    GeneralChat,
    PatientChat(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Patients => "/patients".to_string(),
            Self::PatientDetail(id) => format!("/patients/{id}"),
            Self::GeneralChat => "/chat/general".to_string(),
            Self::PatientChat(id) => format!("/chat/patient/{id}"),
        }
    }

    /// Match a path against the known routes. Trailing slashes are ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Self::Home),
            ["patients"] => Some(Self::Patients),
            ["patients", id] => Some(Self::PatientDetail((*id).to_string())),
            ["chat", "general"] => Some(Self::GeneralChat),
            ["chat", "patient", id] => Some(Self::PatientChat((*id).to_string())),
            _ => None,
        }
    }

    /// Patient the route is scoped to, if any.
    pub fn patient_id(&self) -> Option<&str> {
        match self {
            Self::PatientDetail(id) | Self::PatientChat(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
