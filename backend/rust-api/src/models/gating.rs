use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GatingStatus {
    pub clicks: u32,
    pub limit: u32,
    pub gated: bool,
    pub signed_in: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ClickOutcome {
    /// Whether the requested navigation should proceed
    pub allowed: bool,
    pub show_signup_prompt: bool,
    pub clicks: u32,
    pub remaining: u32,
}
