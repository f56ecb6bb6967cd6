//! Tests for Client
//!
//! These tests verify:
//! - Per-operation reply mapping
//! - Exact bytes written for each operation
//! - Server errors are surfaced, never coerced into success
//! - Error isolation between consecutive commands
//! - Serialized access from multiple threads
//! - A real TCP round-trip, hangup and read timeout

#[path = "../common/mod.rs"]
mod common;

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use common::{bulk, error, multi, nil, reply_bytes, status, ScriptedConnector};
use redwire::protocol::{Command, Reply, Verb};
use redwire::{Client, Config, ConnectionState, RedwireError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_client(replies: &[Reply]) -> (Arc<ScriptedConnector>, Client) {
    let connector = ScriptedConnector::single(replies);
    let client = Client::with_connector(Config::default(), connector.clone()).unwrap();
    (connector, client)
}

fn assert_server_error(err: RedwireError, expected_class: &str, expected_message: &str) {
    match err {
        RedwireError::Server { class, message } => {
            assert_eq!(class, expected_class);
            assert_eq!(message, expected_message);
        }
        other => panic!("Expected server error, got {:?}", other),
    }
}

// =============================================================================
// End-to-End Scenario
// =============================================================================

#[test]
fn test_end_to_end_scenario() {
    let (connector, client) = setup_client(&[
        status("OK"),
        bulk(b"1"),
        Reply::Integer(2),
        nil(),
        Reply::Integer(0),
    ]);

    assert_eq!(client.set("a", "1").unwrap(), "OK");
    assert_eq!(client.get("a").unwrap(), Some(Bytes::from_static(b"1")));
    assert_eq!(client.incr("a", 1).unwrap(), 2);
    assert_eq!(client.get("missing").unwrap(), None);
    assert!(!client.exists("missing").unwrap());

    assert_eq!(
        connector.written_text(),
        "SET a 1\r\n1\r\nGET a\r\nINCR a\r\nGET missing\r\nEXISTS missing\r\n"
    );
    assert_eq!(client.state(), ConnectionState::Connected);
}

// =============================================================================
// Operation Mapping Tests
// =============================================================================

#[test]
fn test_ping() {
    let (connector, client) = setup_client(&[status("PONG")]);
    assert_eq!(client.ping().unwrap(), "PONG");
    assert_eq!(connector.written_text(), "PING\r\n");
}

#[test]
fn test_echo_is_binary_safe() {
    let payload: &'static [u8] = b"hi\r\nthere\x00";
    let (connector, client) = setup_client(&[bulk(payload)]);

    assert_eq!(client.echo(payload).unwrap(), Bytes::from_static(payload));

    let mut expected = b"ECHO 10\r\n".to_vec();
    expected.extend_from_slice(payload);
    expected.extend_from_slice(b"\r\n");
    assert_eq!(connector.written(), expected);
}

#[test]
fn test_set_nx() {
    let (connector, client) = setup_client(&[Reply::Integer(1), Reply::Integer(0)]);

    assert!(client.set_nx("b", "105.2").unwrap());
    assert!(!client.set_nx("b", "xxx").unwrap());
    assert_eq!(
        connector.written_text(),
        "SETNX b 5\r\n105.2\r\nSETNX b 3\r\nxxx\r\n"
    );
}

#[test]
fn test_get_value_with_embedded_newlines() {
    let value = b"\r\naaa\nbbb\r\ncccc\nddd\r\n";
    let (_connector, client) = setup_client(&[bulk(value)]);

    assert_eq!(client.get("c").unwrap().as_deref(), Some(&value[..]));
}

#[test]
fn test_get_empty_value_is_not_nil() {
    let (_connector, client) = setup_client(&[bulk(b"")]);
    assert_eq!(client.get("empty").unwrap(), Some(Bytes::new()));
}

#[test]
fn test_incr_and_decr_amounts() {
    let (connector, client) = setup_client(&[
        Reply::Integer(1),
        Reply::Integer(4),
        Reply::Integer(3),
        Reply::Integer(-2),
    ]);

    assert_eq!(client.incr("a", 1).unwrap(), 1);
    assert_eq!(client.incr("a", 3).unwrap(), 4);
    assert_eq!(client.decr("a", 1).unwrap(), 3);
    assert_eq!(client.decr("a", 5).unwrap(), -2);
    assert_eq!(
        connector.written_text(),
        "INCR a\r\nINCRBY a 3\r\nDECR a\r\nDECRBY a 5\r\n"
    );
}

#[test]
fn test_exists_and_delete() {
    let (connector, client) = setup_client(&[
        Reply::Integer(1),
        Reply::Integer(1),
        Reply::Integer(0),
    ]);

    assert!(client.exists("a").unwrap());
    assert!(client.delete("a").unwrap());
    assert!(!client.delete("a").unwrap());
    assert_eq!(connector.written_text(), "EXISTS a\r\nDEL a\r\nDEL a\r\n");
}

#[test]
fn test_keys_legacy_space_joined_bulk() {
    let (connector, client) = setup_client(&[bulk(b"a a2"), bulk(b""), nil()]);

    assert_eq!(client.keys("a*").unwrap(), vec!["a", "a2"]);
    assert!(client.keys("none*").unwrap().is_empty());
    assert!(client.keys("nil*").unwrap().is_empty());
    assert_eq!(
        connector.written_text(),
        "KEYS a*\r\nKEYS none*\r\nKEYS nil*\r\n"
    );
}

#[test]
fn test_keys_multi_bulk() {
    let (_connector, client) = setup_client(&[
        multi(&[&b"a"[..], &b"has space"[..]]),
        Reply::MultiBulk(None),
    ]);

    // The multi-bulk form keeps keys with spaces intact
    assert_eq!(client.keys("*").unwrap(), vec!["a", "has space"]);
    assert!(client.keys("*").unwrap().is_empty());
}

#[test]
fn test_non_utf8_key_keeps_connection_usable() {
    let (connector, client) = setup_client(&[
        multi(&[&b"ok"[..], &b"\xff\xfe"[..]]),
        bulk(b"\xff"),
        status("PONG"),
    ]);

    let err = client.keys("*").unwrap_err();
    assert!(matches!(err, RedwireError::InvalidData(_)));
    assert_eq!(client.state(), ConnectionState::Connected);

    assert!(matches!(client.randomkey(), Err(RedwireError::InvalidData(_))));
    assert_eq!(client.state(), ConnectionState::Connected);

    // The stream is still at a reply boundary
    assert_eq!(client.ping().unwrap(), "PONG");
    assert_eq!(connector.connects(), 1);
}

#[test]
fn test_randomkey() {
    let (connector, client) = setup_client(&[status("somekey"), status(""), bulk(b"k2"), nil()]);

    assert_eq!(client.randomkey().unwrap(), Some("somekey".to_string()));
    assert_eq!(client.randomkey().unwrap(), None);
    assert_eq!(client.randomkey().unwrap(), Some("k2".to_string()));
    assert_eq!(client.randomkey().unwrap(), None);
    assert_eq!(connector.written_text(), "RANDOMKEY\r\n".repeat(4));
}

#[test]
fn test_rename_and_rename_nx() {
    let (connector, client) = setup_client(&[status("OK"), Reply::Integer(0)]);

    assert_eq!(client.rename("a", "b").unwrap(), "OK");
    assert!(!client.rename_nx("b", "a").unwrap());
    assert_eq!(connector.written_text(), "RENAME a b\r\nRENAMENX b a\r\n");
}

// =============================================================================
// Server Error Tests
// =============================================================================

#[test]
fn test_error_reply_where_status_expected() {
    let (_connector, client) = setup_client(&[error("ERR src and dest key are the same")]);

    let err = client.rename("a", "a").unwrap_err();
    assert_server_error(err, "ERR", "src and dest key are the same");
}

#[test]
fn test_error_reply_is_not_a_falsy_value() {
    let (_connector, client) = setup_client(&[error("ERR wrong type"), Reply::Integer(0)]);

    // An error where an integer is expected must not read as `false`
    assert!(client.exists("a").is_err());
    assert!(!client.exists("a").unwrap());
}

#[test]
fn test_error_reply_where_bulk_expected() {
    let (_connector, client) = setup_client(&[error("WRONGTYPE Operation against a key")]);

    let err = client.get("list").unwrap_err();
    assert_server_error(err, "WRONGTYPE", "Operation against a key");
}

#[test]
fn test_server_error_does_not_corrupt_next_command() {
    let (connector, client) = setup_client(&[error("ERR no such key"), status("OK"), bulk(b"v")]);

    assert!(matches!(
        client.rename("x", "y"),
        Err(RedwireError::Server { .. })
    ));
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.set("k", "v").unwrap(), "OK");
    assert_eq!(client.get("k").unwrap(), Some(Bytes::from_static(b"v")));
    assert_eq!(connector.connects(), 1);
}

#[test]
fn test_execute_surfaces_server_error() {
    let (_connector, client) = setup_client(&[error("ERR unknown"), Reply::Integer(7)]);

    assert!(client.execute(Command::new(Verb::LastSave)).is_err());
    assert_eq!(
        client.execute(Command::new(Verb::LastSave)).unwrap(),
        Reply::Integer(7)
    );
}

// =============================================================================
// Unexpected Reply Tests
// =============================================================================

#[test]
fn test_unexpected_reply_kind_faults() {
    let connector = ScriptedConnector::with_scripts(
        vec![
            reply_bytes(&[Reply::Integer(1)]),
            reply_bytes(&[status("PONG")]),
        ],
        usize::MAX,
    );
    let client = Client::with_connector(Config::default(), connector.clone()).unwrap();

    let err = client.ping().unwrap_err();
    assert!(matches!(err, RedwireError::Protocol(_)));
    assert_eq!(client.state(), ConnectionState::Faulted);

    // Implicit reconnect on the next command
    assert_eq!(client.ping().unwrap(), "PONG");
    assert_eq!(connector.connects(), 2);
}

#[test]
fn test_nil_echo_is_protocol_error() {
    let (_connector, client) = setup_client(&[nil()]);
    assert!(matches!(client.echo("x"), Err(RedwireError::Protocol(_))));
}

#[test]
fn test_invalid_key_rejected_before_io() {
    let (connector, client) = setup_client(&[status("OK")]);

    assert!(matches!(
        client.set("bad key", "v"),
        Err(RedwireError::InvalidArgument(_))
    ));
    assert_eq!(connector.connects(), 0);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[test]
fn test_invalid_config_rejected() {
    let connector = ScriptedConnector::single(&[]);
    let config = Config::builder().port(0).build();
    assert!(matches!(
        Client::with_connector(config, connector),
        Err(RedwireError::Config(_))
    ));
}

// =============================================================================
// List, Set and Persistence Commands
// =============================================================================

#[test]
fn test_list_commands() {
    let (connector, client) = setup_client(&[
        status("OK"),
        status("OK"),
        Reply::Integer(2),
        multi(&[&b"head"[..], &b"tail"[..]]),
        bulk(b"tail"),
        status("OK"),
        status("OK"),
        bulk(b"head"),
        nil(),
    ]);

    assert_eq!(client.rpush("l", "tail").unwrap(), "OK");
    assert_eq!(client.lpush("l", "head").unwrap(), "OK");
    assert_eq!(client.llen("l").unwrap(), 2);
    assert_eq!(
        client.lrange("l", 0, -1).unwrap(),
        vec![Bytes::from_static(b"head"), Bytes::from_static(b"tail")]
    );
    assert_eq!(client.lindex("l", -1).unwrap(), Some(Bytes::from_static(b"tail")));
    assert_eq!(client.lset("l", 0, "x").unwrap(), "OK");
    assert_eq!(client.ltrim("l", 0, 1).unwrap(), "OK");
    assert_eq!(client.lpop("l").unwrap(), Some(Bytes::from_static(b"head")));
    assert_eq!(client.rpop("l").unwrap(), None);

    assert_eq!(
        connector.written_text(),
        "RPUSH l 4\r\ntail\r\n\
         LPUSH l 4\r\nhead\r\n\
         LLEN l\r\n\
         LRANGE l 0 -1\r\n\
         LINDEX l -1\r\n\
         LSET l 0 1\r\nx\r\n\
         LTRIM l 0 1\r\n\
         LPOP l\r\n\
         RPOP l\r\n"
    );
}

#[test]
fn test_lrange_nil_is_empty() {
    let (_connector, client) = setup_client(&[Reply::MultiBulk(None)]);
    assert!(client.lrange("missing", 0, 1).unwrap().is_empty());
}

#[test]
fn test_set_commands() {
    let (connector, client) = setup_client(&[
        Reply::Integer(1),
        Reply::Integer(1),
        Reply::Integer(0),
        multi(&[&b"a"[..], &b"b"[..]]),
        multi(&[&b"a"[..]]),
    ]);

    assert!(client.sadd("s", "a").unwrap());
    assert!(client.srem("s", "b").unwrap());
    assert!(!client.sismember("s", "b").unwrap());
    assert_eq!(client.smembers("s").unwrap().len(), 2);
    assert_eq!(
        client.sinter(&["s1", "s2"]).unwrap(),
        vec![Bytes::from_static(b"a")]
    );

    assert_eq!(
        connector.written_text(),
        "SADD s 1\r\na\r\nSREM s 1\r\nb\r\nSISMEMBER s 1\r\nb\r\nSMEMBERS s\r\nSINTER s1 s2\r\n"
    );
}

#[test]
fn test_sinter_requires_a_key() {
    let (connector, client) = setup_client(&[]);
    assert!(matches!(
        client.sinter(&[]),
        Err(RedwireError::InvalidArgument(_))
    ));
    assert_eq!(connector.connects(), 0);
}

#[test]
fn test_keyspace_and_persistence_commands() {
    let (connector, client) = setup_client(&[
        status("string"),
        status("OK"),
        Reply::Integer(1),
        status("OK"),
        status("Background saving started"),
        Reply::Integer(1_700_000_000),
    ]);

    assert_eq!(client.key_type("a").unwrap(), "string");
    assert_eq!(client.select(1).unwrap(), "OK");
    assert!(client.move_key("a", 0).unwrap());
    assert_eq!(client.save().unwrap(), "OK");
    assert_eq!(client.bgsave().unwrap(), "Background saving started");
    assert_eq!(client.lastsave().unwrap(), 1_700_000_000);

    assert_eq!(
        connector.written_text(),
        "TYPE a\r\nSELECT 1\r\nMOVE a 0\r\nSAVE\r\nBGSAVE\r\nLASTSAVE\r\n"
    );
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_commands_are_serialized() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let replies: Vec<Reply> = (0..THREADS * PER_THREAD).map(|_| status("PONG")).collect();
    let (connector, client) = setup_client(&replies);
    let client = Arc::new(client);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    assert_eq!(client.ping().unwrap(), "PONG");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(connector.written_text(), "PING\r\n".repeat(THREADS * PER_THREAD));
    assert_eq!(connector.connects(), 1);
}

// =============================================================================
// TCP Tests
// =============================================================================

#[test]
fn test_tcp_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    // Server expects exact request bytes and answers with canned replies
    let exchanges: Vec<(Vec<u8>, Vec<u8>)> = vec![
        (b"PING\r\n".to_vec(), b"+PONG\r\n".to_vec()),
        (b"SET k 3\r\na\nb\r\n".to_vec(), b"+OK\r\n".to_vec()),
        (b"GET k\r\n".to_vec(), b"$3\r\na\nb\r\n".to_vec()),
        (b"DEL nope\r\n".to_vec(), b":0\r\n".to_vec()),
    ];

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        for (request, response) in exchanges {
            let mut received = vec![0u8; request.len()];
            stream.read_exact(&mut received).unwrap();
            assert_eq!(received, request);
            stream.write_all(&response).unwrap();
        }
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .connect_timeout_ms(2000)
        .read_timeout_ms(2000)
        .build();
    let client = Client::new(config).unwrap();

    assert_eq!(client.ping().unwrap(), "PONG");
    assert_eq!(client.set("k", &b"a\nb"[..]).unwrap(), "OK");
    assert_eq!(client.get("k").unwrap().as_deref(), Some(&b"a\nb"[..]));
    assert!(!client.delete("nope").unwrap());

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    server.join().unwrap();
}

#[test]
fn test_tcp_server_hangup_faults() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 7];
        stream.read_exact(&mut request).unwrap();
        // Half a reply, then hang up
        stream.write_all(b"$10\r\nabc").unwrap();
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .read_timeout_ms(2000)
        .build();
    let client = Client::new(config).unwrap();

    let err = client.get("k").unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, RedwireError::ConnectionClosed));
    assert_eq!(client.state(), ConnectionState::Faulted);
}

#[test]
fn test_tcp_read_timeout_faults() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 6];
        stream.read_exact(&mut request).unwrap();
        assert_eq!(&request, b"PING\r\n");
        // Never reply; wait for the client to close its side
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .connect_timeout_ms(2000)
        .read_timeout_ms(50)
        .build();
    let client = Client::new(config).unwrap();

    let err = client.ping().unwrap_err();
    assert!(matches!(err, RedwireError::Io(_)), "got {:?}", err);
    assert_eq!(client.state(), ConnectionState::Faulted);

    server.join().unwrap();
}
