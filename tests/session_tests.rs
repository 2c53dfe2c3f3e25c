use battleship_client::protocol::{Message, MessageType, Outcome, Party, RejoinScope, Silence};
use battleship_client::session::inbound::{await_reply, correlate, register_pushes};
use battleship_client::session::LastTurn;
use battleship_client::{
    random_fleet, Board, Cell, Coord, Declined, Dispatcher, Effect, Event, Notice, Request,
    RoomState, Session, Sound, Stage,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn c(code: &str) -> Coord {
    Coord::from_code(code).unwrap()
}

fn fleet() -> Board {
    random_fleet(&mut SmallRng::seed_from_u64(7)).unwrap()
}

/// Feed the reply `line` to `request` through the correlation path.
fn reply(session: &mut Session, request: &Request, line: &str) -> Vec<Effect> {
    let msg = Message::decode(line).unwrap();
    let event = correlate(request, msg.kind(), msg.params()).unwrap();
    session.apply(event)
}

fn push(session: &mut Session, line: &str) -> Vec<Effect> {
    let mut d = Dispatcher::new();
    register_pushes(&mut d);
    let mut effects = Vec::new();
    for event in d.feed(format!("{}\n", line).as_bytes()).unwrap() {
        effects.extend(session.apply(event));
    }
    effects
}

fn in_lobby() -> Session {
    let mut s = Session::new();
    let req = s.handshake("Alice").unwrap();
    reply(&mut s, &req, "ACK");
    s
}

fn in_room() -> Session {
    let mut s = in_lobby();
    let req = s.create_room().unwrap();
    reply(&mut s, &req, "ROOM_CREATED|7421");
    s
}

fn in_game(on_turn: Party) -> Session {
    let mut s = in_room();
    let req = s.declare_ready(&fleet()).unwrap();
    reply(&mut s, &req, "ACK");
    push(&mut s, "OPPONENT_BOARD_READY");
    push(&mut s, &format!("TURN_SET|{}", on_turn.token()));
    s
}

#[test]
fn handshake_moves_to_lobby() {
    let mut s = Session::new();
    let req = s.handshake("Alice").unwrap();
    assert_eq!(req.to_message().encode(), "NICKNAME_SET|Alice\n");

    let effects = reply(&mut s, &req, "ACK");
    assert_eq!(
        effects,
        [Effect::StageChanged { from: Stage::Connect, to: Stage::Lobby }]
    );
    assert_eq!(s.stage(), Stage::Lobby);
    assert_eq!(s.state().player.nickname, "Alice");
}

#[test]
fn taken_nickname_stays_in_connect() {
    let mut s = Session::new();
    let req = s.handshake("Alice").unwrap();
    let effects = reply(&mut s, &req, "NICKNAME_EXISTS");
    assert_eq!(effects, [Effect::Notice(Notice::NicknameTaken)]);
    assert_eq!(s.stage(), Stage::Connect);
}

#[test]
fn bad_nicknames_are_declined() {
    let s = Session::new();
    assert_eq!(s.handshake(""), Err(Declined::InvalidNickname));
    assert_eq!(s.handshake("Al|ce"), Err(Declined::InvalidNickname));
    assert_eq!(s.handshake("Al\nce"), Err(Declined::InvalidNickname));
}

#[test]
fn rejoin_restores_room_or_game() {
    let mut s = Session::new();
    let req = s.handshake("Alice").unwrap();
    reply(&mut s, &req, "REJOIN|ROOM|1234");
    assert_eq!(s.stage(), Stage::InRoom);
    assert_eq!(s.state().room_code.as_deref(), Some("1234"));
    assert_eq!(s.state().player.nickname, "Alice");

    let mut s = Session::new();
    let req = s.handshake("Alice").unwrap();
    let effects = reply(&mut s, &req, "REJOIN|GAME|99");
    assert_eq!(s.stage(), Stage::InGame);
    assert_eq!(
        effects,
        [Effect::StageChanged { from: Stage::Connect, to: Stage::InGame }]
    );
}

#[test]
fn room_created_sets_code() {
    let mut s = in_lobby();
    let req = s.create_room().unwrap();
    assert_eq!(req.to_message().encode(), "ROOM_CREATE\n");
    reply(&mut s, &req, "ROOM_CREATED|7421");
    assert_eq!(s.state().room_code.as_deref(), Some("7421"));
    assert_eq!(s.stage(), Stage::InRoom);
}

#[test]
fn joined_room_uses_requested_code() {
    let mut s = in_lobby();
    let req = s.join_room("5555").unwrap();
    reply(&mut s, &req, "ACK");
    assert_eq!(s.state().room_code.as_deref(), Some("5555"));
    push(&mut s, "OPPONENT_NICKNAME_SET|Bob");
    assert_eq!(s.state().opponent.nickname, "Bob");
    assert_eq!(s.stage(), Stage::InRoom);
}

#[test]
fn failed_joins_notify() {
    let mut s = in_lobby();
    let req = s.join_room("1").unwrap();
    assert_eq!(reply(&mut s, &req, "ROOM_NOT_EXISTS"), [Effect::Notice(Notice::RoomNotFound)]);
    assert_eq!(reply(&mut s, &req, "ROOM_FULL"), [Effect::Notice(Notice::RoomFull)]);
    let req = s.create_room().unwrap();
    assert_eq!(reply(&mut s, &req, "LIMIT_ROOMS|3"), [Effect::Notice(Notice::RoomLimit(3))]);
    assert_eq!(s.stage(), Stage::Lobby);
}

#[test]
fn intents_check_stage() {
    let s = Session::new();
    assert_eq!(
        s.create_room(),
        Err(Declined::WrongStage { expected: &[Stage::Lobby], actual: Stage::Connect })
    );
    let s = in_lobby();
    assert!(matches!(s.handshake("Bob"), Err(Declined::WrongStage { .. })));
    assert!(matches!(s.leave_room(), Err(Declined::WrongStage { .. })));
    assert!(matches!(s.declare_ready(&fleet()), Err(Declined::WrongStage { .. })));
}

#[test]
fn declare_ready_requires_a_legal_fleet() {
    let s = in_room();
    let mut board = fleet();
    let first = board.ship_coords().next().unwrap();
    board.set(first, Cell::Empty);
    assert!(matches!(s.declare_ready(&board), Err(Declined::IllegalPlacement(_))));

    let req = s.declare_ready(&fleet()).unwrap();
    let msg = req.to_message();
    assert_eq!(msg.kind(), MessageType::BoardReady);
    assert_eq!(msg.params().len(), 20);
    assert!(msg.params().iter().all(|code| code.len() == 2));
}

#[test]
fn accepted_board_starts_the_game() {
    let mut s = in_room();
    let board = fleet();
    let req = s.declare_ready(&board).unwrap();
    let effects = reply(&mut s, &req, "ACK");
    assert_eq!(
        effects,
        [Effect::StageChanged { from: Stage::InRoom, to: Stage::InGame }]
    );
    assert_eq!(s.state().player.board, board);
    assert!(s.state().player.ready);
}

#[test]
fn rejected_board_stays_in_room() {
    let mut s = in_room();
    let req = s.declare_ready(&fleet()).unwrap();
    assert_eq!(reply(&mut s, &req, "BOARD_ILLEGAL"), [Effect::Notice(Notice::BoardRejected)]);
    assert_eq!(s.stage(), Stage::InRoom);
    assert!(!s.state().player.ready);
}

#[test]
fn turn_set_gives_exactly_one_side_the_turn() {
    let mut s = in_game(Party::Player);
    assert!(s.state().player.on_turn && !s.state().opponent.on_turn);
    push(&mut s, "TURN_SET|OPPONENT");
    assert!(!s.state().player.on_turn && s.state().opponent.on_turn);
}

#[test]
fn fire_resolves_on_turn_result() {
    let mut s = in_game(Party::Player);
    let req = s.fire(c("45")).unwrap();
    assert_eq!(req.to_message().encode(), "TURN|45\n");
    assert!(s.state().turn_in_flight);

    let effects = reply(&mut s, &req, "TURN_RESULT|YOU|HIT");
    assert_eq!(effects, [Effect::Sound(Sound::Hit)]);
    let state = s.state();
    assert!(!state.turn_in_flight);
    assert_eq!(state.opponent.board.get(c("45")), Cell::Hit);
    assert_eq!(state.last_turn, Some(LastTurn { by: Party::Player, coord: c("45") }));
}

#[test]
fn second_fire_while_in_flight_is_declined() {
    let mut s = in_game(Party::Player);
    s.fire(c("00")).unwrap();
    assert_eq!(s.fire(c("01")), Err(Declined::TurnInFlight));
    assert_eq!(s.fire(c("00")), Err(Declined::TurnInFlight));
}

#[test]
fn fire_checks_turn_and_target() {
    let mut s = in_game(Party::Opponent);
    assert_eq!(s.fire(c("00")), Err(Declined::NotOnTurn));

    let mut s = in_game(Party::Player);
    let req = s.fire(c("00")).unwrap();
    reply(&mut s, &req, "TURN_RESULT|YOU|MISS");
    assert_eq!(s.fire(c("00")), Err(Declined::NotTargetable(c("00"))));
    push(&mut s, "INVALIDATE_FIELD|OPPONENT|11");
    assert_eq!(s.fire(c("11")), Err(Declined::NotTargetable(c("11"))));
}

#[test]
fn server_rejection_clears_turn_in_flight() {
    let mut s = in_game(Party::Player);
    let req = s.fire(c("00")).unwrap();
    assert_eq!(reply(&mut s, &req, "TURN_NOT_YOU"), [Effect::Notice(Notice::TurnRejected)]);
    assert!(!s.state().turn_in_flight);
    let req = s.fire(c("00")).unwrap();
    reply(&mut s, &req, "TURN_ILLEGAL");
    assert!(!s.state().turn_in_flight);
}

#[test]
fn unreadable_turn_result_releases_the_turn() {
    let mut s = in_game(Party::Player);
    let req = s.fire(c("00")).unwrap();
    let mut d = Dispatcher::new();
    register_pushes(&mut d);
    await_reply(&mut d, &req).unwrap();

    let mut effects = Vec::new();
    for event in d.feed(b"TURN_RESULT|HIT\n").unwrap() {
        effects.extend(s.apply(event));
    }
    assert_eq!(effects, [Effect::Notice(Notice::UnreadableReply)]);
    assert!(!d.is_awaiting(MessageType::TurnResult));
    assert!(!s.state().turn_in_flight);
    assert_eq!(s.state().opponent.board.get(c("00")), Cell::Empty);

    let req = s.fire(c("01")).unwrap();
    await_reply(&mut d, &req).unwrap();
}

#[test]
fn unreadable_reply_to_other_requests_keeps_state() {
    let mut s = in_room();
    let req = s.declare_ready(&fleet()).unwrap();
    let mut d = Dispatcher::new();
    await_reply(&mut d, &req).unwrap();
    let events = d.feed(b"ACK|extra\n").unwrap();
    assert_eq!(events, [Event::ReplyUnreadable { request: MessageType::BoardReady }]);
    let before = s.state().clone();
    assert_eq!(s.apply(events[0].clone()), [Effect::Notice(Notice::UnreadableReply)]);
    assert_eq!(s.state(), &before);
    assert!(!s.state().player.ready);
}

#[test]
fn abandon_releases_the_turn() {
    let mut s = in_game(Party::Player);
    let req = s.fire(c("00")).unwrap();
    s.abandon(&req);
    assert!(s.fire(c("00")).is_ok());
}

#[test]
fn opponent_turn_marks_own_board() {
    let mut s = in_game(Party::Opponent);
    assert_eq!(s.state().player.board.get(c("23")), Cell::Empty);
    let effects = push(&mut s, "OPPONENT_TURN|23|HIT");
    assert_eq!(effects, [Effect::Sound(Sound::Hit)]);
    assert_eq!(s.state().player.board.get(c("23")), Cell::Hit);
    assert_eq!(s.state().last_turn, Some(LastTurn { by: Party::Opponent, coord: c("23") }));
}

#[test]
fn single_digit_cell_code_is_row_zero() {
    let mut s = in_game(Party::Opponent);
    push(&mut s, "OPPONENT_TURN|7|MISS");
    assert_eq!(s.state().player.board.get(c("07")), Cell::Miss);
}

#[test]
fn invalidate_field_targets_named_side() {
    let mut s = in_game(Party::Player);
    push(&mut s, "INVALIDATE_FIELD|YOU|99");
    push(&mut s, "INVALIDATE_FIELD|OPPONENT|98");
    assert_eq!(s.state().player.board.get(c("99")), Cell::Invalidated);
    assert_eq!(s.state().opponent.board.get(c("98")), Cell::Invalidated);
}

#[test]
fn board_state_overwrites_side_and_forces_game() {
    let mut s = in_room();
    let mut tokens = vec!["NONE"; 100];
    for (i, cell) in [Cell::Ship, Cell::Hit, Cell::Miss, Cell::Invalidated].into_iter().enumerate() {
        tokens[i] = cell.token();
    }
    let effects = push(&mut s, &format!("BOARD_STATE|YOU|{}", tokens.join("|")));
    assert_eq!(
        effects,
        [Effect::StageChanged { from: Stage::InRoom, to: Stage::InGame }]
    );
    let board = s.state().player.board;
    assert_eq!(board.get(c("00")), Cell::Ship);
    assert_eq!(board.get(c("01")), Cell::Hit);
    assert_eq!(board.get(c("02")), Cell::Miss);
    assert_eq!(board.get(c("03")), Cell::Invalidated);
    assert_eq!(board.count(Cell::Empty), 96);
    assert!(s.state().player.ready);
}

#[test]
fn malformed_board_state_is_dropped() {
    let mut s = in_room();
    push(&mut s, "BOARD_STATE|YOU|NONE");
    let tokens = vec!["WAT"; 100];
    push(&mut s, &format!("BOARD_STATE|OPPONENT|{}", tokens.join("|")));
    assert_eq!(s.stage(), Stage::InRoom);
}

#[test]
fn game_end_clears_turns_and_ready() {
    let mut s = in_game(Party::Player);
    let effects = push(&mut s, "GAME_END|OPPONENT");
    assert_eq!(effects, [Effect::Sound(Sound::Lose)]);
    let state = s.state();
    assert_eq!(state.winner, Some(Party::Opponent));
    assert!(!state.player.on_turn && !state.opponent.on_turn);
    assert!(!state.player.ready && !state.opponent.ready);
    assert_eq!(s.stage(), Stage::InGame);

    // Turn ownership no longer changes once the round is decided.
    push(&mut s, "TURN_SET|YOU");
    assert!(!s.state().player.on_turn);
    assert_eq!(s.fire(c("00")), Err(Declined::RoundOver));
}

#[test]
fn new_game_returns_to_room() {
    let mut s = in_game(Party::Player);
    assert_eq!(s.new_game(), Err(Declined::RoundInProgress));
    assert_eq!(push(&mut s, "GAME_END|YOU"), [Effect::Sound(Sound::Win)]);
    let effects = s.new_game().unwrap();
    assert_eq!(
        effects,
        [Effect::StageChanged { from: Stage::InGame, to: Stage::InRoom }]
    );
    let state = s.state();
    assert_eq!(state.winner, None);
    assert_eq!(state.player.board, Board::new());
    assert_eq!(state.opponent.board, Board::new());
    assert!(!state.player.ready);
    assert_eq!(state.room_code.as_deref(), Some("7421"));
}

#[test]
fn opponent_leaving_returns_to_lobby() {
    let mut s = in_game(Party::Player);
    let effects = push(&mut s, "OPPONENT_ROOM_LEAVE");
    assert_eq!(
        effects,
        [
            Effect::StageChanged { from: Stage::InGame, to: Stage::Lobby },
            Effect::Notice(Notice::OpponentLeft),
        ]
    );
    assert_eq!(s.state().opponent, Default::default());
    assert_eq!(s.state().player.nickname, "Alice");
}

#[test]
fn long_silence_counts_as_leaving() {
    let mut s = in_game(Party::Player);
    push(&mut s, "OPPONENT_NO_RESPONSE|SHORT");
    assert!(!s.state().opponent.responding);
    push(&mut s, "OPPONENT_REJOIN");
    assert!(s.state().opponent.responding);
    push(&mut s, "OPPONENT_NO_RESPONSE|LONG");
    assert_eq!(s.stage(), Stage::Lobby);
}

#[test]
fn leaving_keeps_only_the_nickname() {
    let mut s = in_game(Party::Player);
    let req = s.leave_room().unwrap();
    reply(&mut s, &req, "ACK");
    let mut expected = RoomState::default();
    expected.stage = Stage::Lobby;
    expected.player.nickname = "Alice".into();
    assert_eq!(*s.state(), expected);
}

#[test]
fn connection_closed_resets_everything() {
    for mut s in [Session::new(), in_lobby(), in_room(), in_game(Party::Player)] {
        let from = s.stage();
        let effects = s.apply(Event::ConnectionClosed);
        assert_eq!(*s.state(), RoomState::default());
        assert_eq!(s.stage(), Stage::Connect);
        assert_eq!(effects.last(), Some(&Effect::Notice(Notice::ConnectionLost)));
        if from != Stage::Connect {
            assert_eq!(effects[0], Effect::StageChanged { from, to: Stage::Connect });
        }
    }
}

#[test]
fn pushes_before_handshake_are_ignored() {
    let mut s = Session::new();
    assert!(push(&mut s, "OPPONENT_NICKNAME_SET|Bob").is_empty());
    assert!(push(&mut s, "TURN_SET|YOU").is_empty());
    assert_eq!(*s.state(), RoomState::default());
}

#[test]
fn mismatched_reply_is_a_protocol_error() {
    let req = Request::CreateRoom;
    assert!(correlate(&req, MessageType::Ack, &[]).is_err());
    let turn = Request::Turn(c("00"));
    assert!(correlate(&turn, MessageType::TurnResult, &["YOU".into(), "SUNK".into()]).is_err());
}

#[test]
fn typed_events_match_wire_tokens() {
    let mut s = in_game(Party::Player);
    let effects = s.apply(Event::OpponentTurn { coord: c("10"), outcome: Outcome::Miss });
    assert_eq!(effects, [Effect::Sound(Sound::Miss)]);
    s.apply(Event::OpponentSilent(Silence::Short));
    assert_eq!(
        correlate(
            &Request::SetNickname("A".into()),
            MessageType::Rejoin,
            &["GAME".into(), "1".into()]
        ),
        Ok(Event::Rejoined {
            nickname: "A".into(),
            scope: RejoinScope::Game,
            room_code: "1".into()
        })
    );
}
