use crate::errors::IntoErrorResponse;
use holdem_engine::errors::GameError;
use holdem_engine::lobby::Lobby;
use holdem_engine::player::{ActionRequest, PlayerId};
use holdem_engine::table::RoomCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    /// Cards are dealt by hand at the table; the server only tracks chips
    #[serde(default)]
    pub physical_deck: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub code: RoomCode,
    pub physical_deck: bool,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub code: RoomCode,
    pub player_id: PlayerId,
}

/// `{ "player_id": "...", "kind": "raise", "amount": 10 }`
#[derive(Debug, Deserialize)]
pub struct ActionBody {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub action: ActionRequest,
}

#[derive(Debug, Deserialize)]
pub struct ChooseWinnersRequest {
    /// Seat indices of the chosen winners
    pub winners: Vec<usize>,
    pub amount: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartHandResponse {
    pub started: bool,
}

/// Room codes are issued upper-case; accept them typed in any case.
fn normalize(code: &str) -> RoomCode {
    code.trim().to_ascii_uppercase()
}

fn success_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    reply::with_status(reply::json(&body), status).into_response()
}

fn snapshot_response(lobby: &Lobby, code: &str, status: StatusCode) -> Response {
    match lobby.snapshot(code) {
        Ok(snapshot) => success_response(status, snapshot),
        Err(err) => err.into_http_response(),
    }
}

/// Opens a new room.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/rooms`
///
/// # Request Format
/// ```json
/// { "physical_deck": false }
/// ```
///
/// # Response Format
/// - **Success (201 Created)**: `{ "code": "K3ZQ8", "physical_deck": false }`
/// - **Error (500)**: `storage_poisoned`
pub async fn create_room(lobby: Arc<Lobby>, request: CreateRoomRequest) -> Response {
    match lobby.create_room(request.physical_deck) {
        Ok(code) => success_response(
            StatusCode::CREATED,
            CreateRoomResponse {
                code,
                physical_deck: request.physical_deck,
            },
        ),
        Err(err) => err.into_http_response(),
    }
}

/// Public snapshot of a room. Hole cards are never included.
pub async fn get_room(lobby: Arc<Lobby>, code: String) -> Response {
    snapshot_response(&lobby, &normalize(&code), StatusCode::OK)
}

/// Seats a new player and mints their id.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/rooms/{code}/players`
///
/// # Response Format
/// - **Success (201 Created)**: `{ "code": "K3ZQ8", "player_id": "<uuid>" }`
/// - **Error (404)**: `game_not_found`
/// - **Error (409)**: `room_full`, `name_taken`
/// - **Error (400)**: `invalid_action` for an empty name
///
/// The returned id identifies the player on every later call and on the
/// event stream.
pub async fn join_room(lobby: Arc<Lobby>, code: String, request: JoinRoomRequest) -> Response {
    let code = normalize(&code);
    let player_id = uuid::Uuid::new_v4().to_string();
    match lobby.join_room(&code, player_id.clone(), &request.name) {
        Ok(()) => {
            info!(room = %code, player_id = %player_id, "player joined");
            success_response(StatusCode::CREATED, JoinRoomResponse { code, player_id })
        }
        Err(err) => err.into_http_response(),
    }
}

/// Re-sends the room state and the caller's private hand, then returns the
/// snapshot.
pub async fn rejoin_room(lobby: Arc<Lobby>, code: String, player_id: String) -> Response {
    let code = normalize(&code);
    match lobby.rejoin_room(&code, &player_id) {
        Ok(()) => snapshot_response(&lobby, &code, StatusCode::OK),
        Err(err) => err.into_http_response(),
    }
}

pub async fn leave_room(lobby: Arc<Lobby>, code: String, player_id: String) -> Response {
    let code = normalize(&code);
    match lobby.remove_player(&code, &player_id) {
        Ok(()) => {
            info!(room = %code, player_id = %player_id, "player left");
            reply::with_status(reply::reply(), StatusCode::NO_CONTENT).into_response()
        }
        Err(err) => err.into_http_response(),
    }
}

/// Deals the next hand. `started` is false when fewer than two players have
/// chips.
pub async fn start_hand(lobby: Arc<Lobby>, code: String) -> Response {
    match lobby.start_hand(&normalize(&code)) {
        Ok(started) => success_response(StatusCode::OK, StartHandResponse { started }),
        Err(err) => err.into_http_response(),
    }
}

/// Applies one betting action and answers 202 with the updated snapshot.
///
/// # Error Cases
/// - `player_not_found`: the id is not seated in this room
/// - `not_your_turn`: someone else holds the turn, or no betting is open
/// - `invalid_action`: raise below the minimum, more chips than the balance,
///   missing raise amount
pub async fn submit_action(lobby: Arc<Lobby>, code: String, request: ActionBody) -> Response {
    let code = normalize(&code);
    let action = match request.action.into_action() {
        Ok(action) => action,
        Err(reason) => return GameError::InvalidAction(reason).into_http_response(),
    };
    match lobby.act(&code, &request.player_id, action) {
        Ok(()) => snapshot_response(&lobby, &code, StatusCode::ACCEPTED),
        Err(err) => err.into_http_response(),
    }
}

/// Physical-deck showdown: award `amount` of the oldest open pot to the
/// chosen seats.
pub async fn choose_winners(
    lobby: Arc<Lobby>,
    code: String,
    request: ChooseWinnersRequest,
) -> Response {
    let code = normalize(&code);
    match lobby.choose_winners(&code, &request.winners, request.amount) {
        Ok(()) => snapshot_response(&lobby, &code, StatusCode::OK),
        Err(err) => err.into_http_response(),
    }
}
