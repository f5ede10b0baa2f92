use solidtutor::chat::scripted::{ScriptStep, ScriptedChatService};
use solidtutor::sketch::{analyze, AnalyzeOutcome, Point};
use solidtutor::tutor::SessionState;
use solidtutor::{GeometryKind, SketchCanvas, Speaker, TutorSession};
use std::time::{Duration, Instant};

fn draw_stroke(canvas: &mut SketchCanvas, points: &[(f32, f32)]) {
    let mut points = points.iter().map(|(x, y)| Point::new(*x, *y));
    if let Some(first) = points.next() {
        canvas.press(first);
    }
    for point in points {
        canvas.move_to(point);
    }
    canvas.release();
}

#[test]
fn freehand_sketch_is_confirmed_then_tutored() {
    let mut canvas = SketchCanvas::default();
    draw_stroke(&mut canvas, &[(10.0, 10.0), (60.0, 40.0), (120.0, 15.0)]);
    assert_eq!(canvas.curves().len(), 1);

    let pending = match analyze(&canvas) {
        AnalyzeOutcome::NeedsConfirmation(pending) => pending,
        other => panic!("freehand sketch should need confirmation, got {other:?}"),
    };
    let context = pending.pick(GeometryKind::Frustum);
    assert_eq!(context.kind(), GeometryKind::Frustum);
    assert!(!context.text().is_empty());

    let service = ScriptedChatService::with_steps([ScriptStep::reply(["Vol", "ume is ", "10"])]);
    let mut session = TutorSession::start(context, &service).with_retrieval_delay(Duration::ZERO);
    let opener = &session.transcript()[0].text;
    assert!(!opener.contains("faces"));
    assert!(!opener.contains("vertices"));

    session.submit("What is the volume?").expect("question should be accepted");
    assert_eq!(session.state(), SessionState::Retrieving);
    assert!(session.retrieval_due(Instant::now()));
    session.stream_reply().expect("reply should start");
    session.pump();

    let last = session.transcript().last().expect("reply exists");
    assert_eq!(last.speaker, Speaker::Ai);
    assert_eq!(last.text, "Volume is 10");
    assert_eq!(session.state(), SessionState::Ready);

    let prompts = service.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("frustum"));
    assert!(prompts[0].contains("Volume"));
}

#[test]
fn template_sketch_skips_confirmation() {
    let mut canvas = SketchCanvas::default();
    canvas.insert_template(GeometryKind::Pyramid);

    let context = match analyze(&canvas) {
        AnalyzeOutcome::Ready(context) => context,
        other => panic!("template sketch should be ready, got {other:?}"),
    };
    assert_eq!(context.kind(), GeometryKind::Pyramid);

    let service = ScriptedChatService::new();
    let session = TutorSession::start(context, &service);
    assert_eq!(session.transcript().len(), 1);
    assert!(service.system_instructions()[0].contains("Pyramid problem"));
}

#[test]
fn cancelled_confirmation_leaves_canvas_untouched() {
    let mut canvas = SketchCanvas::default();
    draw_stroke(&mut canvas, &[(0.0, 0.0), (30.0, 30.0)]);

    if let AnalyzeOutcome::NeedsConfirmation(pending) = analyze(&canvas) {
        pending.cancel();
    } else {
        panic!("freehand sketch should need confirmation");
    }
    assert_eq!(canvas.curves().len(), 1);
    assert_eq!(canvas.confirmed_kind(), GeometryKind::Complex);
}
