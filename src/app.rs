use crate::theme::Theme;
use eframe::egui::{self, Align2, Color32, Pos2, RichText, ScrollArea, Sense};
use solidtutor::chat::ChatService;
use solidtutor::scene::SceneDescription;
use solidtutor::sketch::{
    analyze, AnalyzeOutcome, CanvasChange, PathCurve, PendingConfirmation, Point, Segment,
};
use solidtutor::tutor::{SessionState, Speaker, TutorSession};
use solidtutor::{AppConfig, GeometryKind, ImageRef, ProblemContext, SketchCanvas};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

const CANVAS_SIZE: egui::Vec2 = egui::vec2(640.0, 420.0);
const PREVIEW_SIZE: egui::Vec2 = egui::vec2(260.0, 220.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Sketch,
    Text,
    Image,
}

pub struct TutorApp {
    theme: Theme,
    config: AppConfig,
    service: Arc<dyn ChatService>,
    canvas: SketchCanvas,
    mode: InputMode,
    problem_text: String,
    problem_kind: GeometryKind,
    image_handle: String,
    pending: Option<PendingConfirmation>,
    session: Option<TutorSession>,
    input_buffer: String,
    diagnostics_log: Vec<String>,
    scroll_to_bottom: bool,
    preview_yaw: f32,
}

impl TutorApp {
    pub fn new(
        theme: Theme,
        config: AppConfig,
        service: Arc<dyn ChatService>,
        warnings: Vec<String>,
    ) -> Self {
        let canvas = SketchCanvas::default().with_min_point_distance(config.min_point_distance);
        let mut app = Self {
            theme,
            config,
            service,
            canvas,
            mode: InputMode::Sketch,
            problem_text: String::new(),
            problem_kind: GeometryKind::Complex,
            image_handle: String::new(),
            pending: None,
            session: None,
            input_buffer: String::new(),
            diagnostics_log: Vec::new(),
            scroll_to_bottom: false,
            preview_yaw: 0.6,
        };

        for warning in warnings {
            app.log_diagnostic(warning);
        }
        let template_diagnostics: Vec<String> = app
            .canvas
            .templates()
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.to_log_line())
            .collect();
        for line in template_diagnostics {
            app.log_diagnostic(line);
        }

        app
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn start_session(&mut self, context: ProblemContext) {
        info!(kind = %context.kind(), "entering workspace");
        let session = TutorSession::start(context, self.service.as_ref())
            .with_retrieval_delay(self.config.retrieval_delay());
        if !session.is_connected() {
            self.log_diagnostic(format!("chat service '{}' unavailable", self.service.name()));
        }
        self.session = Some(session);
        self.input_buffer.clear();
        self.scroll_to_bottom = true;
    }

    fn leave_workspace(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.input_buffer.clear();
    }

    fn solve_sketch(&mut self) {
        match analyze(&self.canvas) {
            AnalyzeOutcome::Empty => {}
            AnalyzeOutcome::Ready(context) => self.start_session(context),
            AnalyzeOutcome::NeedsConfirmation(pending) => self.pending = Some(pending),
        }
    }

    /// Advance the session: apply streamed fragments and start replies whose
    /// retrieval pause is over.
    fn drive_session(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.retrieval_due(Instant::now()) {
            if let Err(err) = session.stream_reply() {
                debug!("stream_reply rejected: {err}");
            }
            self.scroll_to_bottom = true;
        }
        if !session.pump().is_empty() {
            self.scroll_to_bottom = true;
        }

        match session.state() {
            SessionState::Retrieving | SessionState::Streaming => {
                ctx.request_repaint_after(Duration::from_millis(30));
            }
            _ => {}
        }
    }

    fn submit_question(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.submit(&self.input_buffer) {
            Ok(_) => {
                self.input_buffer.clear();
                self.scroll_to_bottom = true;
            }
            Err(err) => debug!("question not sent: {err}"),
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let service_label = if self.service.name() == "offline" {
            ("Offline tutor", self.theme.warning)
        } else {
            ("Chat bridge", self.theme.success)
        };
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Solid Tutor");
                ui.separator();
                ui.label(RichText::new(service_label.0).color(service_label.1));
                if self.session.is_some() {
                    ui.separator();
                    if ui.button("New problem").clicked() {
                        self.leave_workspace();
                    }
                }
            });
        });
    }

    fn render_input_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.mode, InputMode::Sketch, "Sketch");
                ui.selectable_value(&mut self.mode, InputMode::Text, "Type");
                ui.selectable_value(&mut self.mode, InputMode::Image, "Photo");
            });
            ui.separator();

            match self.mode {
                InputMode::Sketch => self.render_sketch(ui),
                InputMode::Text => self.render_text_input(ui),
                InputMode::Image => self.render_image_input(ui),
            }

            ui.add_space(self.theme.spacing_12);
            self.render_diagnostics(ui);
        });
    }

    fn render_sketch(&mut self, ui: &mut egui::Ui) {
        let mut changes = Vec::new();
        ui.horizontal(|ui| {
            for kind in self.canvas.templates().kinds() {
                if ui.button(format!("Insert {}", kind.label())).clicked() {
                    changes.push(self.canvas.insert_template(kind));
                }
            }
            ui.separator();
            if ui.button("Undo").clicked() {
                changes.push(self.canvas.undo());
            }
            if ui.button("Clear").clicked() {
                changes.push(self.canvas.clear());
            }
            ui.separator();
            let solve = ui.add_enabled(
                !self.canvas.is_empty() && self.pending.is_none(),
                egui::Button::new("Solve"),
            );
            if solve.clicked() {
                self.solve_sketch();
            }
        });

        self.theme.canvas_frame().show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(CANVAS_SIZE, Sense::drag());
            let origin = response.rect.min;
            let to_canvas = |pos: Pos2| Point::new(pos.x - origin.x, pos.y - origin.y);

            if self.pending.is_none() {
                if response.drag_started() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        changes.push(self.canvas.press(to_canvas(pos)));
                    }
                }
                if response.dragged() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        if response.rect.contains(pos) {
                            changes.push(self.canvas.move_to(to_canvas(pos)));
                        } else {
                            changes.push(self.canvas.leave());
                        }
                    }
                }
                if response.drag_stopped() {
                    changes.push(self.canvas.release());
                }
            }

            if self.canvas.is_empty() && !self.canvas.is_drawing() {
                painter.text(
                    response.rect.center(),
                    Align2::CENTER_CENTER,
                    "Draw the solid here, or insert a template",
                    egui::FontId::proportional(15.0),
                    self.theme.text_muted,
                );
            }
            for committed in self.canvas.curves() {
                let color = match committed.source.template_kind() {
                    Some(_) => self.theme.ink_template,
                    None => self.theme.ink_freehand,
                };
                paint_curve(&painter, origin, &committed.curve, self.theme.ink(color));
            }
            if self.canvas.is_drawing() {
                paint_curve(
                    &painter,
                    origin,
                    &self.canvas.stroke_preview(),
                    self.theme.ink(self.theme.ink_preview),
                );
            }
        });

        self.note_canvas_changes(ui.ctx(), &changes);

        let kind = self.canvas.confirmed_kind();
        let status = if kind.is_primitive() {
            format!("Shape: {}", kind.label())
        } else if self.canvas.is_empty() {
            "Shape: nothing drawn yet".to_string()
        } else {
            "Shape: unconfirmed (you will be asked on Solve)".to_string()
        };
        ui.label(RichText::new(status).color(self.theme.text_muted));
    }

    fn note_canvas_changes(&self, ctx: &egui::Context, changes: &[CanvasChange]) {
        let mut redraw = false;
        for change in changes.iter().filter(|change| change.is_change()) {
            match change {
                CanvasChange::StrokeExtended { .. } => {}
                other => debug!(?other, curves = self.canvas.curves().len(), "canvas changed"),
            }
            redraw = true;
        }
        if redraw {
            ctx.request_repaint();
        }
    }

    fn render_kind_picker(&mut self, ui: &mut egui::Ui, id: &str) {
        egui::ComboBox::from_id_salt(id)
            .selected_text(self.problem_kind.label())
            .show_ui(ui, |ui| {
                for kind in GeometryKind::CHOICES {
                    ui.selectable_value(&mut self.problem_kind, kind, kind.label());
                }
            });
    }

    fn render_text_input(&mut self, ui: &mut egui::Ui) {
        ui.label("Type the problem as it is written:");
        ui.add(
            egui::TextEdit::multiline(&mut self.problem_text)
                .desired_rows(6)
                .desired_width(f32::INFINITY)
                .hint_text("e.g. A square pyramid has base edge 6 cm and height 4 cm..."),
        );
        ui.horizontal(|ui| {
            ui.label("Solid:");
            self.render_kind_picker(ui, "text_kind");
            let start = ui.add_enabled(
                !self.problem_text.trim().is_empty(),
                egui::Button::new("Start tutoring"),
            );
            if start.clicked() {
                if let Some(context) = ProblemContext::from_text(self.problem_kind, &self.problem_text)
                {
                    self.start_session(context);
                }
            }
        });
    }

    fn render_image_input(&mut self, ui: &mut egui::Ui) {
        ui.label("Photo recognition is not available yet. Attach a reference and the tutor will ask you for the measurements.");
        ui.add(
            egui::TextEdit::singleline(&mut self.image_handle)
                .desired_width(f32::INFINITY)
                .hint_text("path or name of the picture"),
        );
        ui.horizontal(|ui| {
            ui.label("Solid:");
            self.render_kind_picker(ui, "image_kind");
            let start = ui.add_enabled(
                !self.image_handle.trim().is_empty(),
                egui::Button::new("Start tutoring"),
            );
            if start.clicked() {
                let image = ImageRef::new(self.image_handle.trim());
                self.start_session(ProblemContext::from_image(self.problem_kind, image));
            }
        });
    }

    fn render_confirmation(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };

        // Outer None: still open. Inner None: cancelled.
        let mut decision: Option<Option<GeometryKind>> = None;
        egui::Window::new("Which solid did you draw?")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Sketches are not recognised automatically. Pick the closest shape:");
                ui.horizontal(|ui| {
                    for kind in pending.options() {
                        if ui.button(kind.label()).clicked() {
                            decision = Some(Some(*kind));
                        }
                    }
                });
                ui.separator();
                if ui.button("Cancel").clicked() {
                    decision = Some(None);
                }
            });

        let Some(choice) = decision else {
            return;
        };
        let Some(pending) = self.pending.take() else {
            return;
        };
        match choice {
            Some(kind) => self.start_session(pending.pick(kind)),
            None => pending.cancel(),
        }
    }

    fn render_workspace(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let context = session.context().clone();

        egui::SidePanel::left("problem_panel")
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading(context.kind().label());
                ui.add_space(self.theme.spacing_4);
                self.theme.card_frame().show(ui, |ui| {
                    ui.label(RichText::new(context.text()).color(self.theme.text_primary));
                });
                ui.add_space(self.theme.spacing_8);
                self.render_preview(ui, context.kind());
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_transcript(ui);
            ui.separator();
            self.render_composer(ui);
            self.render_diagnostics(ui);
        });
    }

    fn render_preview(&mut self, ui: &mut egui::Ui, kind: GeometryKind) {
        let Some(scene) = SceneDescription::for_kind(kind) else {
            ui.label(RichText::new("No preview for complex solids").color(self.theme.text_muted));
            return;
        };

        self.theme.canvas_frame().show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(PREVIEW_SIZE, Sense::drag());
            self.preview_yaw += response.drag_delta().x * 0.01;
            let center = response.rect.center();
            let scale = PREVIEW_SIZE.y * 0.55;
            let projected: Vec<Pos2> = scene
                .project(self.preview_yaw, 0.45)
                .into_iter()
                .map(|(x, y)| Pos2::new(center.x + x * scale, center.y + y * scale))
                .collect();
            let stroke = self.theme.ink(self.theme.ink_template);
            for (a, b) in &scene.edges {
                painter.line_segment([projected[*a], projected[*b]], stroke);
            }
        });
        ui.label(RichText::new("Drag to rotate").color(self.theme.text_muted).small());
    }

    fn render_transcript(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let transcript_height = (ui.available_height() - 170.0).max(120.0);
        ScrollArea::vertical()
            .id_salt("chat_transcript")
            .max_height(transcript_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for message in session.transcript() {
                    let (fill, label) = match message.speaker {
                        Speaker::Ai => (self.theme.tutor_bubble, "Tutor"),
                        Speaker::User => (self.theme.user_bubble, "You"),
                    };
                    self.theme.bubble_frame(fill).show(ui, |ui| {
                        ui.label(RichText::new(label).color(self.theme.text_muted).small());
                        let text = if message.pending && message.text.is_empty() {
                            "..."
                        } else {
                            message.text.as_str()
                        };
                        ui.label(text);
                    });
                }
                if session.state() == SessionState::Retrieving {
                    ui.label(
                        RichText::new("Looking up relevant formulas...")
                            .color(self.theme.text_muted)
                            .italics(),
                    );
                }
                if self.scroll_to_bottom {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
        self.scroll_to_bottom = false;
    }

    fn render_composer(&mut self, ui: &mut egui::Ui) {
        let (can_send, state) = match self.session.as_ref() {
            Some(session) => (session.can_send(), session.state()),
            None => return,
        };
        let hint = match state {
            SessionState::Retrieving => "Looking up formulas...",
            SessionState::Streaming => "Tutor is replying...",
            _ => "Ask the tutor...",
        };

        let mut send_now = false;
        ui.horizontal(|ui| {
            let width = ui.available_width() - 80.0;
            let response = ui.add_enabled(
                can_send,
                egui::TextEdit::singleline(&mut self.input_buffer)
                    .desired_width(width)
                    .hint_text(hint),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send_now = true;
            }
            let clicked = ui
                .add_enabled(
                    can_send && !self.input_buffer.trim().is_empty(),
                    egui::Button::new("Send"),
                )
                .clicked();
            send_now |= clicked;
        });

        if send_now && can_send {
            self.submit_question();
        }
    }

    fn render_diagnostics(&self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Diagnostics")
            .default_open(false)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt("diagnostics_log")
                    .max_height(90.0)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if self.diagnostics_log.is_empty() {
                            ui.label(RichText::new("No diagnostics").color(self.theme.text_muted));
                        }
                        for entry in &self.diagnostics_log {
                            ui.label(RichText::new(entry).color(self.theme.danger));
                        }
                    });
            });
    }
}

fn paint_curve(painter: &egui::Painter, origin: Pos2, curve: &PathCurve, stroke: egui::Stroke) {
    let to_screen = |point: Point| Pos2::new(origin.x + point.x, origin.y + point.y);
    let mut cursor = None;
    for segment in curve.segments() {
        match *segment {
            Segment::MoveTo { to } => cursor = Some(to_screen(to)),
            Segment::LineTo { to } => {
                let to = to_screen(to);
                if let Some(from) = cursor {
                    painter.line_segment([from, to], stroke);
                }
                cursor = Some(to);
            }
            Segment::QuadTo { ctrl, to } => {
                let (ctrl, to) = (to_screen(ctrl), to_screen(to));
                if let Some(from) = cursor {
                    painter.add(egui::epaint::QuadraticBezierShape::from_points_stroke(
                        [from, ctrl, to],
                        false,
                        Color32::TRANSPARENT,
                        stroke,
                    ));
                }
                cursor = Some(to);
            }
        }
    }
}

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drive_session(ctx);
        self.render_top_bar(ctx);
        if self.session.is_some() {
            self.render_workspace(ctx);
        } else {
            self.render_input_screen(ctx);
            self.render_confirmation(ctx);
        }
    }
}
