use thiserror::Error;

/// Failures surfaced to a client attempting to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("room '{0}' already exists")]
    RoomAlreadyExists(String),
}

impl JoinError {
    /// Code sent in the `content` of the `error` message.
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::RoomNotFound(_) => "room_not_found",
            JoinError::RoomAlreadyExists(_) => "room_exists",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        assert_eq!(JoinError::RoomNotFound("r1".into()).code(), "room_not_found");
        assert_eq!(JoinError::RoomAlreadyExists("r1".into()).code(), "room_exists");
        assert_eq!(
            JoinError::RoomNotFound("r1".into()).to_string(),
            "room 'r1' not found"
        );
    }
}
