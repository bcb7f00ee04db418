//! The engine: owns the terminal, capabilities, screen and renderer.

use std::collections::VecDeque;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use image::RgbaImage;

use crate::config::EnvConfig;
use crate::core::capabilities::{CellDimensions, Capabilities, Report};
use crate::core::event::{Event, Inbound, Resize};
use crate::core::terminal::{Terminal, TerminalWriter};
use crate::error::Result;
use crate::graphics::image::Image;
use crate::logging;
use crate::platform::process_terminal::ProcessTerminal;
use crate::render::renderer::DiffRenderer;
use crate::render::screen::{Screen, Window};
use crate::runtime::negotiate;
use crate::runtime::queue::Queue;

/// Top-level owner. Single-threaded: input and background work reach it only through the queue.
pub struct Engine<T: Terminal> {
    terminal: T,
    config: EnvConfig,
    caps: Capabilities,
    screen: Screen,
    renderer: DiffRenderer,
    queue: Queue<Inbound>,
    pending: VecDeque<Event>,
    next_image_id: u32,
    started: bool,
    modes_enabled: bool,
}

impl Engine<ProcessTerminal> {
    /// Engine on the process's own tty, configured from the environment.
    ///
    /// Installs the file logger when `TAPE_VT_DEBUG_LOG` is set.
    pub fn from_env() -> Result<Self> {
        let config = EnvConfig::from_env();
        if let Some(path) = config.debug_log.as_deref() {
            logging::init_file_logging(path)?;
        }
        let terminal = ProcessTerminal::new(&config);
        Ok(Self::new(terminal, config))
    }
}

impl<T: Terminal> Engine<T> {
    pub fn new(terminal: T, config: EnvConfig) -> Self {
        let size = terminal.size();
        let mut caps = Capabilities::from_colorterm(config.colorterm.as_deref());
        caps.apply_env(&config);
        let mut screen = Screen::new(size.cols, size.rows);
        screen.set_width_method(caps.width_method);
        let mut engine = Self {
            terminal,
            config,
            caps,
            screen,
            renderer: DiffRenderer::new(size.cols, size.rows),
            queue: Queue::new(),
            pending: VecDeque::new(),
            next_image_id: 0,
            started: false,
            modes_enabled: false,
        };
        engine.update_cell_size(size);
        engine
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// Root window over the whole screen.
    pub fn window(&mut self) -> Window<'_> {
        self.screen.window()
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Start the input listener. Idempotent.
    pub fn start(&mut self) -> Result<()> {
        if !self.started {
            self.terminal.start(self.queue.clone())?;
            self.started = true;
        }
        Ok(())
    }

    /// Query the terminal and wait for its replies.
    ///
    /// Environment overrides are applied afterwards whatever the outcome, and a timeout leaves
    /// every capability discovered so far in place.
    pub fn negotiate(&mut self) -> Result<()> {
        self.start()?;
        self.terminal
            .write(negotiate::query_battery().as_bytes())?;
        let result = negotiate::await_replies(
            &self.queue,
            &mut self.caps,
            self.config.negotiation_timeout,
            &mut self.pending,
        );
        self.caps.apply_env(&self.config);
        self.screen.set_width_method(self.caps.width_method);
        match &result {
            Ok(()) => tracing::debug!(caps = ?self.caps, "negotiation complete"),
            Err(err) => tracing::debug!(error = %err, caps = ?self.caps, "negotiation incomplete"),
        }
        result
    }

    /// Switch the terminal into application mode. The next render redraws everything.
    pub fn enter(&mut self) -> Result<()> {
        self.start()?;
        self.terminal
            .write(negotiate::enable_modes(&self.caps).as_bytes())?;
        self.modes_enabled = true;
        self.renderer.request_full_redraw_next();
        Ok(())
    }

    /// Restore every mode [`Engine::enter`] changed and stop the listener. Idempotent.
    pub fn exit(&mut self) -> Result<()> {
        let mut result = Ok(());
        if self.modes_enabled {
            self.modes_enabled = false;
            result = self
                .terminal
                .write(negotiate::disable_modes(&self.caps).as_bytes());
        }
        if self.started {
            self.started = false;
            let stopped = self.terminal.stop();
            result = result.and(stopped);
        }
        result.map_err(Into::into)
    }

    /// Write the changes since the last cycle. Writes nothing if the screen is unchanged.
    pub fn render(&mut self) -> Result<()> {
        self.renderer.render(
            &mut self.screen,
            &self.caps,
            &mut TerminalWriter(&mut self.terminal),
        )
    }

    /// Redraw every cell and re-issue every placement.
    pub fn refresh(&mut self) -> Result<()> {
        self.renderer.refresh(
            &mut self.screen,
            &self.caps,
            &mut TerminalWriter(&mut self.terminal),
        )
    }

    /// Queue an event for [`Engine::next_event`]. Clones of [`Engine::event_queue`] can do the
    /// same from other threads.
    pub fn post_event(&self, event: Event) {
        self.queue.push(Inbound::Event(event));
    }

    pub fn event_queue(&self) -> Queue<Inbound> {
        self.queue.clone()
    }

    /// Block for the next event. `None` once input is closed and drained.
    ///
    /// Resize events have already been applied to the screen when they are returned.
    pub fn next_event(&mut self) -> Option<Event> {
        if let Some(event) = self.pending.pop_front() {
            return self.accept(Inbound::Event(event));
        }
        loop {
            let item = self.queue.pop()?;
            if let Some(event) = self.accept(item) {
                return Some(event);
            }
        }
    }

    /// Like [`Engine::next_event`], giving up after `timeout`.
    pub fn poll_event(&mut self, timeout: Duration) -> Option<Event> {
        if let Some(event) = self.pending.pop_front() {
            return self.accept(Inbound::Event(event));
        }
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.queue.pop_timeout(remaining) {
                Ok(item) => {
                    if let Some(event) = self.accept(item) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn accept(&mut self, item: Inbound) -> Option<Event> {
        match item {
            Inbound::Event(Event::Resize(size)) => {
                self.resize(size);
                Some(Event::Resize(size))
            }
            Inbound::Event(event) => Some(event),
            Inbound::Report(report) => {
                let cell_size = matches!(report, Report::CellSize(_));
                let before = self.caps.cell_size;
                self.caps.apply(&report);
                if cell_size && self.caps.cell_size != before {
                    Some(Event::CellSize)
                } else {
                    tracing::debug!(?report, "late terminal reply");
                    None
                }
            }
        }
    }

    fn resize(&mut self, size: Resize) {
        self.screen.resize(size.cols, size.rows);
        self.renderer.resize(size.cols, size.rows);
        self.update_cell_size(size);
    }

    fn update_cell_size(&mut self, size: Resize) {
        if size.cols == 0 || size.rows == 0 || size.width_px == 0 || size.height_px == 0 {
            return;
        }
        let dims = CellDimensions {
            width_px: u32::from(size.width_px / size.cols),
            height_px: u32::from(size.height_px / size.rows),
        };
        self.caps.apply(&Report::CellSize(dims));
    }

    /// Wrap `pixels` in the best image variant the terminal supports. Kitty images are uploaded
    /// immediately. `None` when graphics are disabled.
    pub fn new_image(&mut self, pixels: RgbaImage) -> Result<Option<Image>> {
        self.next_image_id = self.next_image_id.wrapping_add(1).max(1);
        let image = Image::new(
            self.next_image_id,
            pixels,
            self.caps.graphics_protocol(),
            self.caps.cell_size,
            &self.queue,
        );
        if let Some(upload) = image.as_ref().and_then(Image::upload) {
            self.terminal.write(&upload)?;
        }
        Ok(image)
    }

    /// Remove every placement of `image` from the screen and free its terminal-side data.
    pub fn destroy_image(&mut self, image: Image) -> Result<()> {
        self.screen.window().remove_placements(image.id());
        let bytes = image.destroy();
        if !bytes.is_empty() {
            self.terminal.write(&bytes)?;
        }
        Ok(())
    }
}

impl<T: Terminal> Drop for Engine<T> {
    fn drop(&mut self) {
        if let Err(err) = self.exit() {
            tracing::warn!(error = %err, "failed to restore terminal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::config::EnvConfig;
    use crate::core::capabilities::{GraphicsProtocol, Report};
    use crate::core::event::{Event, Inbound, Resize};
    use crate::core::terminal::Terminal;
    use crate::runtime::queue::Queue;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Fake {
        output: Arc<Mutex<Vec<u8>>>,
        queue: Arc<Mutex<Option<Queue<Inbound>>>>,
        stops: Arc<Mutex<usize>>,
    }

    impl Terminal for Fake {
        fn start(&mut self, queue: Queue<Inbound>) -> io::Result<()> {
            *self.queue.lock().unwrap() = Some(queue);
            Ok(())
        }

        fn stop(&mut self) -> io::Result<()> {
            *self.stops.lock().unwrap() += 1;
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> io::Result<()> {
            self.output.lock().unwrap().extend_from_slice(data);
            Ok(())
        }

        fn size(&self) -> Resize {
            Resize {
                cols: 10,
                rows: 4,
                width_px: 100,
                height_px: 80,
            }
        }
    }

    impl Fake {
        fn take_output(&self) -> String {
            String::from_utf8(std::mem::take(&mut *self.output.lock().unwrap())).unwrap()
        }
    }

    fn engine() -> (Engine<Fake>, Fake) {
        let fake = Fake::default();
        (Engine::new(fake.clone(), EnvConfig::default()), fake)
    }

    #[test]
    fn initial_size_and_cell_pixels_come_from_terminal() {
        let (engine, _) = engine();
        assert_eq!((engine.screen().cols(), engine.screen().rows()), (10, 4));
        let cell = engine.capabilities().cell_size;
        assert_eq!((cell.width_px, cell.height_px), (10, 20));
    }

    #[test]
    fn negotiation_applies_env_overrides_after_replies() {
        let fake = Fake::default();
        let config = EnvConfig {
            legacy_sgr: true,
            graphics_ceiling: Some(GraphicsProtocol::HalfBlock),
            ..EnvConfig::default()
        };
        let mut engine = Engine::new(fake.clone(), config);
        engine.start().unwrap();
        let queue = engine.event_queue();
        queue.push(Inbound::Report(Report::Capability {
            name: "Smulx".to_string(),
            value: None,
        }));
        queue.push(Inbound::Report(Report::KittyGraphics { ok: true }));
        queue.push(Inbound::Event(Event::FocusIn));
        queue.push(Inbound::Report(Report::PrimaryDeviceAttributes(vec![62])));

        engine.negotiate().unwrap();
        assert!(fake.take_output().ends_with("\x1b[16t\x1b[c"));
        let caps = engine.capabilities();
        assert!(caps.legacy_sgr);
        assert!(!caps.styled_underline);
        assert!(caps.kitty_graphics);
        assert_eq!(caps.graphics_protocol(), GraphicsProtocol::HalfBlock);
        assert_eq!(engine.poll_event(Duration::from_millis(10)), Some(Event::FocusIn));
    }

    #[test]
    fn resize_events_reallocate_screen() {
        let (mut engine, _) = engine();
        engine.post_event(Event::Resize(Resize {
            cols: 30,
            rows: 6,
            width_px: 0,
            height_px: 0,
        }));
        let event = engine.poll_event(Duration::from_secs(1));
        assert!(matches!(event, Some(Event::Resize(_))));
        assert_eq!((engine.screen().cols(), engine.screen().rows()), (30, 6));
    }

    #[test]
    fn resize_buffered_during_negotiation_is_applied() {
        let (mut engine, _) = engine();
        engine.start().unwrap();
        let queue = engine.event_queue();
        queue.push(Inbound::Event(Event::Resize(Resize {
            cols: 30,
            rows: 6,
            width_px: 240,
            height_px: 96,
        })));
        queue.push(Inbound::Report(Report::PrimaryDeviceAttributes(vec![62])));
        engine.negotiate().unwrap();

        let event = engine.poll_event(Duration::from_millis(10));
        assert!(matches!(event, Some(Event::Resize(_))));
        assert_eq!((engine.screen().cols(), engine.screen().rows()), (30, 6));
        assert_eq!(engine.renderer.committed().cols(), 30);
        assert_eq!(engine.capabilities().cell_size.width_px, 8);
    }

    #[test]
    fn late_cell_size_reply_becomes_an_event() {
        let (mut engine, _) = engine();
        let queue = engine.event_queue();
        queue.push(Inbound::Report(Report::CellSize(
            crate::core::capabilities::CellDimensions {
                width_px: 7,
                height_px: 14,
            },
        )));
        queue.push(Inbound::Report(Report::KittyKeyboard(1)));
        queue.push(Inbound::Event(Event::Redraw));
        assert_eq!(engine.poll_event(Duration::from_secs(1)), Some(Event::CellSize));
        assert_eq!(engine.poll_event(Duration::from_secs(1)), Some(Event::Redraw));
        assert_eq!(engine.capabilities().cell_size.width_px, 7);
    }

    #[test]
    fn enter_and_exit_bracket_modes_once() {
        let (mut engine, fake) = engine();
        engine.enter().unwrap();
        assert!(fake.take_output().starts_with("\x1b[?1049h"));
        engine.exit().unwrap();
        assert!(fake.take_output().ends_with("\x1b[?1049l"));
        engine.exit().unwrap();
        drop(engine);
        assert!(fake.take_output().is_empty());
        assert_eq!(*fake.stops.lock().unwrap(), 1);
    }

    #[test]
    fn render_writes_only_changes() {
        let (mut engine, fake) = engine();
        engine
            .window()
            .print(0, 0, "hi", crate::core::style::Style::default());
        engine.render().unwrap();
        assert!(fake.take_output().contains("hi"));
        engine.render().unwrap();
        assert!(fake.take_output().is_empty());
    }

    #[test]
    fn kitty_images_are_uploaded_and_destroyed() {
        let (mut engine, fake) = engine();
        engine.caps.kitty_graphics = true;
        let pixels = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        let image = engine.new_image(pixels).unwrap().unwrap();
        assert!(fake.take_output().starts_with("\x1b_Ga=t,t=d,f=32,s=2,v=2,i=1,"));
        engine.destroy_image(image).unwrap();
        assert_eq!(fake.take_output(), "\x1b_Ga=d,d=I,i=1,q=2\x1b\\");
    }
}
