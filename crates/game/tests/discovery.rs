use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use delve::net::codec;
use delve::net::{ClientDiscovery, DiscoveryMessage, HostAdvert, HostDiscovery};

fn advert(name: &str) -> HostAdvert {
    HostAdvert {
        name: name.into(),
        game_port: 5000,
        ip: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
    }
}

fn loopback_host(name: &str) -> HostDiscovery {
    HostDiscovery::bind(SocketAddr::from(([127, 0, 0, 1], 0)), advert(name)).unwrap()
}

#[test]
fn test_client_finds_host() {
    let host = loopback_host("Cellar");
    let client = ClientDiscovery::with_target(host.local_addr(), Duration::from_millis(20)).unwrap();

    let start = Instant::now();
    let mut hosts = client.hosts();
    while hosts.is_empty() && start.elapsed() < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(10));
        hosts = client.hosts();
    }

    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[&("127.0.0.1".to_string(), 5000)], "Cellar");
}

#[test]
fn test_host_ignores_foreign_magic() {
    let host = loopback_host("Cellar");
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();

    let foreign = codec::encode(&DiscoveryMessage::Discover {
        magic: "SOMEONE_ELSE".into(),
    })
    .unwrap();
    socket.send_to(&foreign, host.local_addr()).unwrap();

    let mut buffer = [0u8; 1024];
    assert!(socket.recv_from(&mut buffer).is_err());

    let discover = codec::encode(&DiscoveryMessage::discover()).unwrap();
    socket.send_to(&discover, host.local_addr()).unwrap();

    let (size, _) = socket.recv_from(&mut buffer).unwrap();
    let reply: DiscoveryMessage = codec::decode(&buffer[..size]).unwrap();
    match reply {
        DiscoveryMessage::HostAd { ip, port, name, .. } => {
            assert_eq!(ip, "127.0.0.1");
            assert_eq!(port, 5000);
            assert_eq!(name, "Cellar");
        }
        other => panic!("expected host_ad, got {:?}", other),
    }
}

#[test]
fn test_closing_stops_the_responder() {
    let mut host = loopback_host("Cellar");
    let addr = host.local_addr();
    host.close();

    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    let discover = codec::encode(&DiscoveryMessage::discover()).unwrap();
    let _ = socket.send_to(&discover, addr);

    let mut buffer = [0u8; 1024];
    assert!(socket.recv_from(&mut buffer).is_err());
}
