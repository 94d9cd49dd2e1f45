mod common;

use citadel_fetch::{
    ConsumerId, JobPhase, JobState, Method, NetworkManager, Request, TargetType, TransportEvent,
};
use common::*;

#[test]
fn test_successful_load() {
    init_logging();
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/docs/page.html"));

    assert_eq!(manager.job_phase(ConsumerId(1)), Some(JobPhase::Opening));
    feed(&mut manager, job, ok_html("<p>hello</p>"));

    let consumer = consumer.borrow();
    assert_eq!(
        consumer.seen,
        vec![Seen::Response(200), Seen::Data(b"<p>hello</p>".to_vec()), Seen::Finished]
    );

    let response = &consumer.responses[0];
    assert_eq!(response.mime_type(), Some("text/html"));
    assert_eq!(response.text_encoding(), Some("utf-8"));
    assert_eq!(response.expected_content_length(), Some(12));
    assert_eq!(response.suggested_filename(), Some("page.html"));
    assert_eq!(response.status_text(), "OK");
}

#[test]
fn test_content_disposition_names_the_download() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/download?id=3"));

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::open(200, "OK"),
            TransportEvent::header("Content-Disposition", "attachment; filename=\"report.pdf\""),
            TransportEvent::data(&b"%PDF"[..]),
            TransportEvent::Done,
        ],
    );

    let consumer = consumer.borrow();
    assert_eq!(consumer.responses[0].suggested_filename(), Some("report.pdf"));
    assert_eq!(consumer.responses[0].mime_type(), None);
}

#[test]
fn test_sniffed_mime_type_wins() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/image"));

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::open(200, "OK"),
            TransportEvent::header("Content-Type", "text/plain"),
            TransportEvent::header("x-sniffed-mime-type", "image/png"),
            TransportEvent::data(&b"\x89PNG"[..]),
            TransportEvent::Done,
        ],
    );

    assert_eq!(consumer.borrow().responses[0].mime_type(), Some("image/png"));
}

#[test]
fn test_duplicate_and_informational_opens_are_ignored() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::open(100, "Continue"),
            TransportEvent::open(200, "OK"),
            TransportEvent::open(500, "Internal Server Error"),
            TransportEvent::data(&b"body"[..]),
            TransportEvent::Done,
        ],
    );

    assert_eq!(
        consumer.borrow().seen,
        vec![Seen::Response(200), Seen::Data(b"body".to_vec()), Seen::Finished]
    );
}

#[test]
fn test_headers_before_status_are_dropped() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::header("X-Early", "1"),
            TransportEvent::open(200, "OK"),
            TransportEvent::header("X-Late", "2"),
            TransportEvent::data(&b"x"[..]),
            TransportEvent::header("X-After-Response", "3"),
            TransportEvent::Done,
        ],
    );

    let consumer = consumer.borrow();
    let response = &consumer.responses[0];
    assert!(response.header("X-Early").is_none());
    assert_eq!(response.header("x-late").map(String::as_str), Some("2"));
    assert!(response.header("X-After-Response").is_none());
}

#[test]
fn test_done_without_status_is_a_network_error() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://unreachable.example/"));

    feed(&mut manager, job, vec![TransportEvent::Done]);

    assert_eq!(consumer.borrow().seen, vec![Seen::Failed(Failure::Transport(-1))]);
    assert_eq!(manager.job(job).map(|j| j.response().status()), Some(404));
}

#[test]
fn test_negative_status_keeps_extended_code() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    feed(&mut manager, job, vec![TransportEvent::open(-2, "DNS lookup failed"), TransportEvent::Done]);

    assert_eq!(consumer.borrow().seen, vec![Seen::Failed(Failure::Transport(-2))]);
    let finished = manager.job(job).unwrap();
    assert_eq!(finished.extended_status(), -2);
    assert_eq!(finished.response().status(), 404);
}

#[test]
fn test_http_error_without_body_fails() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/missing"));

    feed(&mut manager, job, vec![TransportEvent::open(404, "Not Found"), TransportEvent::Done]);

    assert_eq!(consumer.borrow().seen, vec![Seen::Failed(Failure::Http(404))]);
}

#[test]
fn test_http_error_with_body_finishes() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/missing"));

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::open(404, "Not Found"),
            TransportEvent::data(&b"<h1>Not Found</h1>"[..]),
            TransportEvent::Done,
        ],
    );

    assert_eq!(
        consumer.borrow().seen,
        vec![Seen::Response(404), Seen::Data(b"<h1>Not Found</h1>".to_vec()), Seen::Finished]
    );
}

#[test]
fn test_script_driven_request_sees_http_errors() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let request = get("https://example.com/api").with_target_type(TargetType::XmlHttpRequest);
    let job = start(&mut manager, &transport, &consumer, request);

    feed(&mut manager, job, vec![TransportEvent::open(500, "Internal Server Error"), TransportEvent::Done]);

    assert_eq!(consumer.borrow().seen, vec![Seen::Response(500), Seen::Finished]);
}

#[test]
fn test_upload_progress_and_wml_flag() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let request = Request::new(Method::POST, "https://example.com/form").unwrap().with_body("a=1");
    let job = start(&mut manager, &transport, &consumer, request);

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::DataSent { sent: 3, total: 3 },
            TransportEvent::open(200, "OK"),
            TransportEvent::WmlOverride,
            TransportEvent::data(&b"<wml/>"[..]),
            TransportEvent::Done,
        ],
    );

    let consumer = consumer.borrow();
    assert_eq!(consumer.seen[0], Seen::Sent(3, 3));
    assert!(consumer.responses[0].is_wml());
    assert_eq!(consumer.last(), Some(&Seen::Finished));
}

#[test]
fn test_empty_chunks_are_not_delivered() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::open(200, "OK"),
            TransportEvent::data(Vec::new()),
            TransportEvent::data(&b"a"[..]),
            TransportEvent::Done,
        ],
    );

    assert_eq!(
        consumer.borrow().seen,
        vec![Seen::Response(200), Seen::Data(b"a".to_vec()), Seen::Finished]
    );
}

#[test]
fn test_stop_job_cancels_transport_and_silences_consumer() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    feed(&mut manager, job, vec![TransportEvent::open(200, "OK"), TransportEvent::data(&b"part"[..])]);
    assert_eq!(manager.job_phase(ConsumerId(1)), Some(JobPhase::StreamingData));

    assert!(manager.stop_job(ConsumerId(1)));
    assert!(transport.was_cancelled(0));
    assert!(!manager.has_job(ConsumerId(1)));
    assert_eq!(manager.job(job).map(|j| j.state()), Some(JobState::Cancelled));

    // the transport may still be flushing
    feed(&mut manager, job, vec![TransportEvent::data(&b"more"[..]), TransportEvent::Done]);
    assert!(!manager.stop_job(ConsumerId(1)));

    assert_eq!(consumer.borrow().seen, vec![Seen::Response(200), Seen::Data(b"part".to_vec())]);

    manager.run_until_idle();
    assert_eq!(manager.job_count(), 0);
}

#[test]
fn test_pause_load_throttles_transport_only() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    assert!(manager.pause_load(ConsumerId(1), true));
    assert!(transport.is_paused(0));

    // what the transport already produced is still delivered
    feed(&mut manager, job, vec![TransportEvent::open(200, "OK"), TransportEvent::data(&b"a"[..])]);
    assert_eq!(consumer.borrow().seen, vec![Seen::Response(200), Seen::Data(b"a".to_vec())]);
    assert_eq!(manager.job(job).map(|j| j.defer_count()), Some(0));

    assert!(manager.pause_load(ConsumerId(1), false));
    assert!(!transport.is_paused(0));

    feed(&mut manager, job, vec![TransportEvent::Done]);
    assert!(!manager.pause_load(ConsumerId(1), true));
    assert!(!manager.pause_load(ConsumerId(2), true));
}

#[test]
fn test_cancel_from_inside_data_callback() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    consumer.borrow_mut().cancel_on_data = true;
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    feed(
        &mut manager,
        job,
        vec![
            TransportEvent::open(200, "OK"),
            TransportEvent::data(&b"one"[..]),
            TransportEvent::data(&b"two"[..]),
            TransportEvent::Done,
        ],
    );

    assert_eq!(consumer.borrow().seen, vec![Seen::Response(200), Seen::Data(b"one".to_vec())]);
    assert!(transport.was_cancelled(0));
}

#[test]
fn test_cancel_from_inside_response_callback() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    consumer.borrow_mut().cancel_on_response = true;
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/"));

    feed(&mut manager, job, ok_html("ignored"));

    assert_eq!(consumer.borrow().seen, vec![Seen::Response(200)]);
}

#[test]
fn test_consumer_can_start_again_after_finish() {
    let mut manager = NetworkManager::new();
    let transport = MockTransport::shared();
    let consumer = RecordingConsumer::shared();
    let job = start(&mut manager, &transport, &consumer, get("https://example.com/a"));
    feed(&mut manager, job, ok_html("a"));

    let second = start(&mut manager, &transport, &consumer, get("https://example.com/b"));
    assert_ne!(job, second);
    assert_eq!(manager.job_state(ConsumerId(1)), Some(JobState::Running));
}
