//! Room directory: rooms, protection secrets and persisted memberships.

mod directory;
mod repository;
mod types;

pub use directory::SqlRoomDirectory;
pub use repository::{MembershipRepository, RoomRepository};
pub use types::{Membership, NewRoom, Room, RoomId, RoomMemberInfo, RoomSummary, RoomView};
