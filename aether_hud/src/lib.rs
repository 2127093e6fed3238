//! # aether_hud
//!
//! Sign-in HUD: a sensor half that authenticates the user by face, fist,
//! voice or typed secret, and a render half that shows the session as a
//! particle field.  The halves talk through a polled bridge document, so
//! they can share one process or run as two.
//!
//! ## Roles
//!
//! | Role | Runs | Bridge |
//! |---|---|---|
//! | `both` (default) | sensors, auth, field | in memory, or `--bridge PATH` |
//! | `sensor` | sensors, auth, bridge writes | file |
//! | `render` | bridge polling, field | file |
//!
//! ## Session → field
//!
//! | Status | Field |
//! |---|---|
//! | `INITIALIZING` | boot scatter |
//! | `AUTH_PENDING` | face mask |
//! | `ONLINE` | explosion, then the current shape breathing with the voice |
//! | `LISTENING` | particles stream toward the hand |
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: keyboard shortcuts stand in for the camera.
//! * `leap` — **Hardware mode**: hand tracking via LeapC.
//! * `mic` — live microphone amplitude via cpal.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Effect |
//! |---|---|
//! | `F1` | Face in view on/off |
//! | `F2` | Hand in view on/off |
//! | `F3` / `F4` / `F5` | Fist / open palm / victory |
//! | `F6` | Say the wake phrase |
//! | `F7` | Push the hand toward the sensor |
//! | `F8` | Listening on/off |
//! | Arrows | Move the hand |
//! | `PgUp` / `PgDn` | Widen / close the pinch |
//! | letters | Override secret |
//! | `Escape` | Quit |

pub mod app;
pub mod gesture;
pub mod scheduler;
pub mod visualizer;
