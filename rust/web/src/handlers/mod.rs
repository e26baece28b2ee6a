pub mod health;
pub mod rooms;
pub mod sse;

pub use health::health;
pub use rooms::{
    choose_winners, create_room, get_room, join_room, leave_room, rejoin_room, start_hand,
    submit_action, ActionBody, ChooseWinnersRequest, CreateRoomRequest, CreateRoomResponse,
    JoinRoomRequest, JoinRoomResponse, StartHandResponse,
};
pub use sse::{stream_events, EventsQuery};
