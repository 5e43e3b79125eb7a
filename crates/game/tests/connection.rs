use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use delve::Role;
use delve::lobby::{ClientLobby, HostLobby, JoinState, Lobby, LobbyEvent};
use delve::net::{
    ClientSocket, DenyReason, HOST_PEER_ID, HostSocket, MAX_PLAYERS, Message, NetConfig,
    PROTOCOL_VERSION,
};

fn poll<T>(timeout_ms: u64, mut step: impl FnMut() -> Option<T>) -> Option<T> {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if let Some(value) = step() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

fn wait_for_messages(socket: &mut ClientSocket, count: usize) -> Vec<Message> {
    let mut received = Vec::new();
    poll(1000, || {
        received.extend(socket.receive_all());
        (received.len() >= count).then_some(())
    });
    received
}

fn hosted_lobby() -> (HostLobby, SocketAddr) {
    let socket = HostSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr();
    (HostLobby::new(socket, Lobby::hosted(MAX_PLAYERS)), addr)
}

fn pump_until_event(host: &mut HostLobby) -> LobbyEvent {
    poll(1000, || host.pump().into_iter().next()).expect("host saw no lobby event")
}

#[test]
fn test_hello_gets_welcome_then_lobby_state() {
    let (mut host, host_addr) = hosted_lobby();
    let mut client = ClientSocket::bind("127.0.0.1:0", host_addr).unwrap();

    client.send(&Message::Hello {
        protocol: PROTOCOL_VERSION,
        name: "X".into(),
    });

    match pump_until_event(&mut host) {
        LobbyEvent::Joined { peer_id, addr } => {
            assert_eq!(peer_id, "peer:1");
            assert_eq!(addr, client.local_addr());
        }
        other => panic!("unexpected event {:?}", other),
    }

    let received = wait_for_messages(&mut client, 2);
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], Message::welcome("peer:1"));
    match &received[1] {
        Message::LobbyState { slots } => {
            assert_eq!(slots.len(), MAX_PLAYERS);
            assert!(slots.iter().any(|s| s.peer_id.as_deref() == Some("peer:1")));
        }
        other => panic!("expected lobby_state, got {:?}", other),
    }
}

#[test]
fn test_full_lobby_denies_join() {
    let (mut host, host_addr) = hosted_lobby();

    let mut joined = Vec::new();
    for n in 1..MAX_PLAYERS {
        let mut lobby = ClientLobby::connect(host_addr, format!("p{}", n)).unwrap();
        lobby.join();
        assert!(matches!(pump_until_event(&mut host), LobbyEvent::Joined { .. }));
        joined.push(lobby);
    }
    assert!(host.lobby().is_full());

    let mut late = ClientSocket::bind("127.0.0.1:0", host_addr).unwrap();
    late.send(&Message::hello("late"));

    assert_eq!(
        pump_until_event(&mut host),
        LobbyEvent::Denied {
            addr: late.local_addr(),
            reason: DenyReason::Full,
        }
    );
    assert_eq!(
        wait_for_messages(&mut late, 1),
        vec![Message::JoinDeny {
            reason: DenyReason::Full
        }]
    );
    assert_eq!(host.lobby().slot_count(), MAX_PLAYERS);
    assert_eq!(host.socket().peers().len(), MAX_PLAYERS - 1);
}

#[test]
fn test_protocol_mismatch_is_denied() {
    let (mut host, host_addr) = hosted_lobby();
    let mut client = ClientSocket::bind("127.0.0.1:0", host_addr).unwrap();

    client.send(&Message::Hello {
        protocol: PROTOCOL_VERSION + 1,
        name: "old".into(),
    });

    assert!(matches!(
        pump_until_event(&mut host),
        LobbyEvent::Denied {
            reason: DenyReason::ProtocolMismatch,
            ..
        }
    ));
    assert_eq!(host.lobby().occupied_count(), 1);
}

#[test]
fn test_repeated_hello_keeps_one_seat() {
    let (mut host, host_addr) = hosted_lobby();
    let mut client = ClientSocket::bind("127.0.0.1:0", host_addr).unwrap();

    client.send(&Message::hello("X"));
    pump_until_event(&mut host);
    client.send(&Message::hello("X"));

    let mut received = Vec::new();
    poll(1000, || {
        host.pump();
        received.extend(client.receive_all());
        (received.len() >= 4).then_some(())
    });

    let welcomes: Vec<&Message> = received
        .iter()
        .filter(|m| matches!(m, Message::Welcome { .. }))
        .collect();
    assert_eq!(
        welcomes,
        vec![&Message::welcome("peer:1"), &Message::welcome("peer:1")]
    );
    assert_eq!(host.lobby().occupied_count(), 2);
}

#[test]
fn test_second_joiner_is_announced_to_first() {
    let (mut host, host_addr) = hosted_lobby();

    let mut first = ClientLobby::connect(host_addr, "first").unwrap();
    first.join();
    pump_until_event(&mut host);
    poll(1000, || first.pump().peer_id().map(str::to_string));

    let mut second = ClientLobby::connect(host_addr, "second").unwrap();
    second.join();
    match pump_until_event(&mut host) {
        LobbyEvent::Joined { peer_id, .. } => assert_eq!(peer_id, "peer:2"),
        other => panic!("unexpected event {:?}", other),
    }

    poll(1000, || {
        first.pump();
        first
            .slots()
            .iter()
            .any(|s| s.peer_id.as_deref() == Some("peer:2"))
            .then_some(())
    })
    .expect("first client never saw the second");

    let local = first.local_slot().unwrap();
    assert_eq!(local.peer_id.as_deref(), Some("peer:1"));
}

#[test]
fn test_disconnect_frees_slot() {
    let (mut host, host_addr) = hosted_lobby();
    let mut client = ClientLobby::connect(host_addr, "X").unwrap();
    client.join();
    pump_until_event(&mut host);
    poll(1000, || client.pump().peer_id().map(str::to_string));

    client.leave();
    assert_eq!(
        pump_until_event(&mut host),
        LobbyEvent::Left {
            peer_id: "peer:1".into()
        }
    );
    assert_eq!(host.lobby().occupied_count(), 1);
    assert!(host.socket().peers().is_empty());
    assert_eq!(client.state(), &JoinState::Idle);
}

#[test]
fn test_start_only_when_everyone_ready() {
    let (mut host, host_addr) = hosted_lobby();
    let mut client = ClientLobby::connect(host_addr, "X").unwrap();
    client.join();
    pump_until_event(&mut host);
    poll(1000, || client.pump().peer_id().map(str::to_string));

    host.update_local(Some(2), Some(true));
    assert!(host.try_start().is_none());

    assert!(client.select_hero(4));
    assert!(client.set_ready(true));
    poll(1000, || {
        host.pump();
        host.lobby().all_ready().then_some(())
    })
    .expect("ready never reached the host");

    let data = host.try_start().unwrap();
    assert_eq!(data.heroes[HOST_PEER_ID], "hero.knight_red");
    assert_eq!(data.heroes["peer:1"], "hero.knight_purple");

    let state = poll(1000, || {
        let started = matches!(client.pump(), JoinState::Started { .. });
        started.then(|| client.state().clone())
    })
    .expect("client never started");
    assert_eq!(
        state,
        JoinState::Started {
            peer_id: "peer:1".into(),
            lobby: data.clone(),
        }
    );

    let host_context = host.into_context(NetConfig::default()).unwrap();
    assert_eq!(host_context.role(), Role::Host);
    let client_context = client.into_context(NetConfig::default()).unwrap();
    assert_eq!(client_context.local_peer_id(), "peer:1");
    assert_eq!(client_context.lobby_data(), Some(&data));
}

#[test]
fn test_lobby_update_from_wrong_address_is_ignored() {
    let (mut host, host_addr) = hosted_lobby();
    let mut client = ClientLobby::connect(host_addr, "X").unwrap();
    client.join();
    pump_until_event(&mut host);

    let mut spoof = ClientSocket::bind("127.0.0.1:0", host_addr).unwrap();
    spoof.send(&Message::LobbyUpdate {
        peer_id: "peer:1".into(),
        hero_index: None,
        ready: Some(true),
    });
    spoof.send(&Message::Ping { time: 1.5 });

    // The pong proves the spoofed update was processed first.
    assert_eq!(reply_after_pump(&mut host, &mut spoof), Message::Pong { time: 1.5 });
    assert!(!host.lobby().slot_of("peer:1").unwrap().ready);
}

fn reply_after_pump(host: &mut HostLobby, socket: &mut ClientSocket) -> Message {
    poll(1000, || {
        host.pump();
        socket.receive_all().into_iter().next()
    })
    .expect("no reply")
}
