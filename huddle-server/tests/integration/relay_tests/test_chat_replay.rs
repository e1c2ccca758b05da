use huddle_core::{ClientEvent, ServerEvent};
use huddle_server::SignalingService;

use crate::integration::{TestConnection, init_tracing, join};

fn chat(data: &str, sender: &str) -> ClientEvent {
    ClientEvent::ChatMessage {
        data: data.into(),
        sender: sender.into(),
    }
}

#[test]
fn test_late_joiner_gets_history_in_order() {
    init_tracing();

    let service = SignalingService::new(vec![]);
    let mut a = TestConnection::open(&service);
    let mut b = TestConnection::open(&service);

    service.handle_event(a.session_id, join("r1", "alice"));
    service.handle_event(a.session_id, chat("hi", "alice"));
    service.handle_event(a.session_id, chat("anyone?", "alice"));
    a.drain();

    service.handle_event(b.session_id, join("r1", "bob"));
    service.handle_event(a.session_id, chat("welcome", "alice"));

    let chats: Vec<(String, String)> = b
        .drain()
        .into_iter()
        .skip_while(|e| !matches!(e, ServerEvent::UserList { .. }))
        .skip(1)
        .map(|e| match e {
            ServerEvent::ChatMessage {
                data,
                sender,
                sender_session_id,
            } => {
                assert_eq!(sender_session_id, a.session_id);
                (sender, data)
            }
            other => panic!("unexpected event {:?}", other),
        })
        .collect();

    assert_eq!(
        chats,
        vec![
            ("alice".to_owned(), "hi".to_owned()),
            ("alice".to_owned(), "anyone?".to_owned()),
            ("alice".to_owned(), "welcome".to_owned()),
        ]
    );
}

#[test]
fn test_chat_is_sanitized_and_echoed_to_sender() {
    let service = SignalingService::new(vec![]);
    let mut a = TestConnection::open(&service);

    service.handle_event(a.session_id, join("r1", "alice"));
    a.drain();

    service.handle_event(a.session_id, chat("<script>x()</script>hey <i>", ""));

    let events = a.drain();
    let [ServerEvent::ChatMessage {
        data,
        sender,
        sender_session_id,
    }] = events.as_slice()
    else {
        panic!("expected own echo, got {:?}", events);
    };
    assert_eq!(data, "hey &lt;i&gt;");
    assert_eq!(sender, "alice");
    assert_eq!(*sender_session_id, a.session_id);
}

#[test]
fn test_chat_outside_room_is_ignored() {
    let service = SignalingService::new(vec![]);
    let mut a = TestConnection::open(&service);

    service.handle_event(a.session_id, chat("hello?", "ghost"));

    assert!(a.drain().is_empty());
    assert_eq!(service.registry().room_count(), 0);
}
