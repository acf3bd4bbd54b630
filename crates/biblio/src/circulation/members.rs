use super::domain::MemberId;

/// Boundary to the externally owned member service. The engine only ever
/// asks two questions; enrollment, suspension, and profile data stay on the
/// other side of this trait.
pub trait MemberDirectory: Send + Sync {
    fn member_exists(&self, id: &MemberId) -> Result<bool, DirectoryError>;
    fn is_blocked(&self, id: &MemberId) -> Result<bool, DirectoryError>;
}

/// Error surfaced by the member collaborator.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("member directory unavailable: {0}")]
    Unavailable(String),
}
