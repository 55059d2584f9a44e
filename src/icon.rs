use std::path::Path;
use std::sync::LazyLock;

const COLOR_RECORDING: (u8, u8, u8) = (222, 49, 49);
const COLOR_CLASSIFYING: (u8, u8, u8) = (255, 196, 0);
pub const ICON_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/icon.png");

static ICON: LazyLock<tray_icon::Icon> = LazyLock::new(|| load_icon(ICON_PATH, None));
static ICON_RECORDING: LazyLock<tray_icon::Icon> =
    LazyLock::new(|| load_icon(ICON_PATH, Some(COLOR_RECORDING)));
static ICON_CLASSIFYING: LazyLock<tray_icon::Icon> =
    LazyLock::new(|| load_icon(ICON_PATH, Some(COLOR_CLASSIFYING)));

/// What the tray indicator reflects: recording wins over a pending
/// submission, everything else is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Idle,
    Recording,
    Classifying,
}

impl IndicatorState {
    pub fn icon(&self) -> tray_icon::Icon {
        match self {
            IndicatorState::Idle => ICON.clone(),
            IndicatorState::Recording => ICON_RECORDING.clone(),
            IndicatorState::Classifying => ICON_CLASSIFYING.clone(),
        }
    }
}

fn load_icon(path: impl AsRef<Path>, recolor: Option<(u8, u8, u8)>) -> tray_icon::Icon {
    let (icon_rgba, icon_width, icon_height) = {
        let mut image = image::open(path)
            .expect("Failed to open icon path")
            .into_rgba8();

        if let Some((r, g, b)) = recolor {
            for pixel in image.pixels_mut() {
                pixel[0] = r;
                pixel[1] = g;
                pixel[2] = b;
            }
        }

        let (width, height) = image.dimensions();
        let rgba = image.into_raw();
        (rgba, width, height)
    };
    tray_icon::Icon::from_rgba(icon_rgba, icon_width, icon_height).expect("Failed to open icon")
}
