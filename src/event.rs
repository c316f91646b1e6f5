// event.rs
//! Window input translated into engine events, queued until the next frame.
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    KeyPressed(KeyCode),
    KeyReleased(KeyCode),
    MouseMoved { dx: f32, dy: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    Resized { width: u32, height: u32 },
    Quit,
}

impl Event {
    /// Engine event for a window event, if it carries one. Key repeats are
    /// dropped so every press has exactly one release.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CloseRequested => Some(Event::Quit),
            WindowEvent::Resized(size) => Some(Event::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => Some(Self::from_key(*code, *state)),
            WindowEvent::MouseInput { state, button, .. } => Some(Event::MouseButton {
                button: *button,
                pressed: *state == ElementState::Pressed,
            }),
            _ => None,
        }
    }

    /// Relative mouse motion comes from the device, not the window.
    pub fn from_device_event(event: &DeviceEvent) -> Option<Self> {
        match event {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => Some(Event::MouseMoved {
                dx: *dx as f32,
                dy: *dy as f32,
            }),
            _ => None,
        }
    }

    pub fn from_key(code: KeyCode, state: ElementState) -> Self {
        match state {
            ElementState::Pressed => Event::KeyPressed(code),
            ElementState::Released => Event::KeyReleased(code),
        }
    }

    pub fn is_key_pressed(&self, code: KeyCode) -> bool {
        matches!(self, Event::KeyPressed(pressed) if *pressed == code)
    }
}

/// Events gathered between frames, handed out once per frame.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consecutive mouse motion is merged into one event.
    pub fn push(&mut self, event: Event) {
        if let (Event::MouseMoved { dx, dy }, Some(Event::MouseMoved { dx: last_dx, dy: last_dy })) =
            (event, self.pending.last_mut())
        {
            *last_dx += dx;
            *last_dy += dy;
            return;
        }
        self.pending.push(event);
    }

    pub fn poll(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn window_events_translate() {
        assert_eq!(
            Event::from_window_event(&WindowEvent::CloseRequested),
            Some(Event::Quit)
        );
        assert_eq!(
            Event::from_window_event(&WindowEvent::Resized(PhysicalSize::new(800, 600))),
            Some(Event::Resized {
                width: 800,
                height: 600
            })
        );
        assert_eq!(Event::from_window_event(&WindowEvent::Focused(true)), None);
    }

    #[test]
    fn keys_and_motion() {
        let pressed = Event::from_key(KeyCode::Escape, ElementState::Pressed);
        assert!(pressed.is_key_pressed(KeyCode::Escape));
        assert!(!pressed.is_key_pressed(KeyCode::Space));
        assert_eq!(
            Event::from_key(KeyCode::Space, ElementState::Released),
            Event::KeyReleased(KeyCode::Space)
        );

        let motion = DeviceEvent::MouseMotion { delta: (2.0, -1.0) };
        assert_eq!(
            Event::from_device_event(&motion),
            Some(Event::MouseMoved { dx: 2.0, dy: -1.0 })
        );
    }

    #[test]
    fn poll_drains_and_merges_motion() {
        let mut queue = EventQueue::new();
        queue.push(Event::MouseMoved { dx: 1.0, dy: 1.0 });
        queue.push(Event::MouseMoved { dx: 2.0, dy: -3.0 });
        queue.push(Event::KeyPressed(KeyCode::KeyW));
        queue.push(Event::MouseMoved { dx: 1.0, dy: 0.0 });

        let events = queue.poll();
        assert_eq!(
            events,
            vec![
                Event::MouseMoved { dx: 3.0, dy: -2.0 },
                Event::KeyPressed(KeyCode::KeyW),
                Event::MouseMoved { dx: 1.0, dy: 0.0 },
            ]
        );
        assert!(queue.is_empty());
        assert!(queue.poll().is_empty());
    }
}
