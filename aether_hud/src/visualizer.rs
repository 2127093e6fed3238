//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │                  particle field (perspective)                │
//! │                                                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  [STATUS TEXT]   STATE  SHAPE  AUTH        voice ▮▮▮▮▯▯▯      │
//! │  key legend                                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use particle_field::color::{dim, rgb_to_argb};
use particle_field::{FieldFrame, FieldRenderer, Vec3};

use crate::gesture::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 960;
pub const WIN_H:     usize = 600;
const STATUS_H:      usize = 44;
const FIELD_H:       usize = WIN_H - STATUS_H;
const STATUS_Y:      usize = FIELD_H;
const BG_COLOR:      u32   = 0xFF05070D;
const STATUS_BG:     u32   = 0xFF0F1A2E;
const TEXT_COLOR:    u32   = 0xFFEEEEEE;
const ACCENT:        u32   = 0xFF00FFFF;
const PROMPT_COLOR:  u32   = 0xFFFFD700;
const LEGEND_COLOR:  u32   = 0xFF888888;

/// Camera sits on +Z looking at the origin.
const CAMERA_DIST:   f32   = 60.0;
const FOV_DEG:       f32   = 75.0;
/// Per-point glow contribution.
const POINT_GAIN:    f32   = 0.55;

/// Everything the status bar shows.
#[derive(Clone, Copy, Debug, Default)]
pub struct HudInfo<'a> {
    pub status: &'a str,
    pub visual: &'a str,
    pub shape: &'a str,
    pub auth: &'a str,
    pub amplitude: f32,
    pub prompt: bool,
    pub listening: bool,
}

/// Rotate, then perspective-project a field point into the field viewport.
pub fn project(p: Vec3, rot_y: f32, rot_z: f32, w: usize, h: usize) -> Option<(usize, usize)> {
    let r = p.rotate_yz(rot_y, rot_z);
    let depth = CAMERA_DIST - r.z;
    if depth <= 1.0 || !r.is_finite() {
        return None;
    }
    let focal = h as f32 / (2.0 * (FOV_DEG.to_radians() / 2.0).tan());
    let sx = w as f32 / 2.0 + r.x * focal / depth;
    let sy = h as f32 / 2.0 - r.y * focal / depth;
    if sx < 0.0 || sy < 0.0 || sx >= w as f32 || sy >= h as f32 {
        return None;
    }
    Some((sx as usize, sy as usize))
}

/// Printable character for a letter/digit key.
pub fn key_char(k: Key) -> Option<char> {
    let c = match k {
        Key::A => 'a', Key::B => 'b', Key::C => 'c', Key::D => 'd', Key::E => 'e',
        Key::F => 'f', Key::G => 'g', Key::H => 'h', Key::I => 'i', Key::J => 'j',
        Key::K => 'k', Key::L => 'l', Key::M => 'm', Key::N => 'n', Key::O => 'o',
        Key::P => 'p', Key::Q => 'q', Key::R => 'r', Key::S => 's', Key::T => 't',
        Key::U => 'u', Key::V => 'v', Key::W => 'w', Key::X => 'x', Key::Y => 'y',
        Key::Z => 'z',
        Key::Key0 => '0', Key::Key1 => '1', Key::Key2 => '2', Key::Key3 => '3',
        Key::Key4 => '4', Key::Key5 => '5', Key::Key6 => '6', Key::Key7 => '7',
        Key::Key8 => '8', Key::Key9 => '9',
        Key::Space => ' ',
        _ => return None,
    };
    Some(c)
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
}

impl Visualizer {
    pub fn new(title: &str) -> Result<Self, String> {
        let mut window = Window::new(
            title,
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard input.  `None` means quit.
    pub fn poll_input(&mut self) -> Option<Vec<SimInput>> {
        if !self.window.is_open() { return None; }

        let mut out = Vec::new();
        // Keys that trigger on first press only
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        // Keys that repeat while held
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Escape) {
            return None;
        }

        const ONE_SHOT: [(Key, SimKey); 8] = [
            (Key::F1, SimKey::ToggleFace),
            (Key::F2, SimKey::ToggleHand),
            (Key::F3, SimKey::Fist),
            (Key::F4, SimKey::Palm),
            (Key::F5, SimKey::Victory),
            (Key::F6, SimKey::SayWakePhrase),
            (Key::F7, SimKey::Reach),
            (Key::F8, SimKey::ToggleListen),
        ];
        const HELD: [(Key, SimKey); 6] = [
            (Key::Left,     SimKey::Left),
            (Key::Right,    SimKey::Right),
            (Key::Up,       SimKey::Up),
            (Key::Down,     SimKey::Down),
            (Key::PageDown, SimKey::PinchIn),
            (Key::PageUp,   SimKey::PinchOut),
        ];
        for (k, s) in ONE_SHOT {
            if one_shot(k) { out.push(SimInput::KeyDown(s)); }
        }
        for (k, s) in HELD {
            if held(k) { out.push(SimInput::KeyDown(s)); }
        }

        // Letters and digits feed the override buffer.
        for k in self.window.get_keys_pressed(KeyRepeat::No) {
            if let Some(c) = key_char(k) {
                out.push(SimInput::Char(c));
            }
        }
        Some(out)
    }

    /// Clear the whole framebuffer.
    pub fn clear(&mut self) {
        self.buf.fill(BG_COLOR);
    }

    /// Draw the status bar.
    pub fn draw_hud(&mut self, hud: &HudInfo<'_>) {
        self.fill_rect(0, STATUS_Y, WIN_W, STATUS_H, STATUS_BG);
        self.draw_border(0, STATUS_Y, WIN_W, STATUS_H, dim(ACCENT, 0.4));

        let status_color = if hud.prompt { PROMPT_COLOR } else { ACCENT };
        self.draw_label(hud.status, 10, STATUS_Y + 8, status_color);

        let info = format!("{}  {}  auth:{}", hud.visual, hud.shape, hud.auth);
        self.draw_label(&info, 240, STATUS_Y + 8, TEXT_COLOR);

        // Voice meter
        let meter_x = WIN_W - 180;
        self.draw_label(if hud.listening { "listening" } else { "voice" }, meter_x, STATUS_Y + 8, TEXT_COLOR);
        let filled = (hud.amplitude.clamp(0.0, 1.0) * 100.0) as usize;
        self.draw_border(meter_x + 44, STATUS_Y + 6, 102, 9, dim(ACCENT, 0.6));
        self.fill_rect(meter_x + 45, STATUS_Y + 7, filled, 7, ACCENT);

        if hud.prompt {
            self.draw_label("make a fist to override", 10, STATUS_Y + 20, PROMPT_COLOR);
        }

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "f1=face f2=hand f3=fist f4=palm f5=victory f6=say f7=reach f8=listen arrows=move pgup/pgdn=pinch type=override esc=quit",
            10, WIN_H - 10, LEGEND_COLOR,
        );
    }

    /// Push the framebuffer to the window.
    pub fn present(&mut self) {
        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            if y < WIN_H           { self.buf[y           * WIN_W + col] = color; }
            if y+h-1 < WIN_H       { self.buf[(y+h-1)     * WIN_W + col] = color; }
        }
        for row in y..(y+h).min(WIN_H) {
            if x < WIN_W           { self.buf[row * WIN_W + x    ] = color; }
            if x+w-1 < WIN_W       { self.buf[row * WIN_W + x+w-1] = color; }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn add_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            let i = y * WIN_W + x;
            self.buf[i] = add_colors(self.buf[i], color);
        }
    }

    /// Minimal bitmap font — 3×5 characters.
    /// Each character is encoded as 5 rows × 3 bits.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > WIN_W { break; }
        }
    }
}

impl FieldRenderer for Visualizer {
    /// Points are added rather than overwritten, so dense regions glow.
    fn render(&mut self, frame: &FieldFrame<'_>) {
        self.fill_rect(0, 0, WIN_W, FIELD_H, BG_COLOR);
        for (p, c) in frame.positions.iter().zip(frame.colors) {
            if let Some((x, y)) = project(*p, frame.rot_y, frame.rot_z, WIN_W, FIELD_H) {
                self.add_pixel(x, y, rgb_to_argb(*c * POINT_GAIN));
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '[' => [0b110, 0b100, 0b100, 0b100, 0b110],
        ']' => [0b011, 0b001, 0b001, 0b001, 0b011],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Per-channel saturating add of two ARGB colors.
fn add_colors(a: u32, b: u32) -> u32 {
    let ch = |shift: u32| (((a >> shift) & 0xFF) + ((b >> shift) & 0xFF)).min(0xFF) << shift;
    0xFF000000 | ch(16) | ch(8) | ch(0)
}
