use std::sync::Arc;

use anyhow::{Context, Result};
use arboard::Clipboard;
use chirp::config_ext::ConfigExt;
use chirp::event::ChirpEvent;
use chirp::notify::{NotificationLayer, notify};
use chirp::panel::{AcquisitionPanel, CLASSIFY_FAILED};
use chirp::preview::PreviewPlayer;
use chirp::process::ClassifyPipeline;
use chirp::{
    APP_NAME_PRETTY, ConfigManager, DEFAULT_LOG_LEVEL, HttpClassifier, Recorder, VERSION,
};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tao::dpi::LogicalSize;
use tao::event::{Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tao::window::{Window, WindowBuilder};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tray_icon::menu::{AboutMetadataBuilder, Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIcon, TrayIconBuilder, TrayIconEvent};

fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CHIRP_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .finish()
        .with(NotificationLayer::new())
        .init();

    // Load config
    let config_manager = ConfigManager::new()?;
    let config = config_manager.load()?;
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config)?;

    // Resolved once at startup; the environment override wins over the file.
    let base_url = config.resolve_api_url();
    info!(%base_url, "Using classification endpoint");
    let classifier = Arc::new(HttpClassifier::new(&base_url)?);
    let record_limit = config.record_limit();

    // Set up hotkey
    let hotkey_manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
    let hotkey = config.hotkey();
    hotkey_manager
        .register(hotkey)
        .context("Failed to register hotkey")?;

    // Set up recorder and panel state
    let recorder = Recorder::new();
    let mut panel = AcquisitionPanel::new();
    let mut player = PreviewPlayer::new();
    let mut clipboard = Clipboard::new()?;

    // Create the tray menu
    let tray_menu = Menu::new();
    let item_record = MenuItem::new("Start/stop recording", true, None);
    let item_classify = MenuItem::new("Classify selection", true, None);
    let item_play = MenuItem::new("Play preview", true, None);
    let item_clear = MenuItem::new("Clear selection", true, None);
    let item_copy_result = MenuItem::new("Copy last result", true, None);
    let item_copy_config = MenuItem::new("Copy config path", true, None);
    let item_quit = MenuItem::new("Quit", true, None);
    tray_menu.append_items(&[
        // the name of the app
        &MenuItem::new(APP_NAME_PRETTY, false, None),
        &PredefinedMenuItem::separator(),
        &item_record,
        &item_classify,
        &item_play,
        &item_clear,
        &PredefinedMenuItem::separator(),
        &item_copy_result,
        &item_copy_config,
        &PredefinedMenuItem::about(
            None,
            Some(
                AboutMetadataBuilder::new()
                    .version(Some(VERSION.to_owned()))
                    .build(),
            ),
        ),
        &PredefinedMenuItem::separator(),
        &item_quit,
    ])?;

    // Set up the event loop
    let mut icon_tray: Option<TrayIcon> = None;

    let menu_channel = MenuEvent::receiver();
    let tray_channel = TrayIconEvent::receiver();
    let hotkey_channel = GlobalHotKeyEvent::receiver();

    let event_loop: EventLoop<ChirpEvent> = EventLoopBuilder::with_user_event().build();
    let event_sender = event_loop.create_proxy();

    // The drop-target window is the only chrome besides the tray.
    let window = WindowBuilder::new()
        .with_title(format!("{APP_NAME_PRETTY} - drop an audio file"))
        .with_inner_size(LogicalSize::new(360.0, 160.0))
        .build(&event_loop)
        .context("Failed to create window")?;

    // Set up the pipeline for handling submissions off the loop thread
    let pipeline = ClassifyPipeline::new(classifier, event_sender)?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => {
                // We create the icon once the event loop is actually running
                // to prevent issues like https://github.com/tauri-apps/tray-icon/issues/90

                icon_tray.replace(
                    TrayIconBuilder::new()
                        .with_menu(Box::new(tray_menu.clone()))
                        .with_tooltip("chirp - audio classification")
                        .with_icon(panel.indicator().icon())
                        .build()
                        .unwrap(),
                );

                // We have to request a redraw here to have the icon actually show up.
                // Tao only exposes a redraw method on the Window so we use core-foundation directly.
                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};

                    let rl = CFRunLoopGetMain();
                    CFRunLoopWakeUp(rl);
                }

                info!("Chirp ready");
            }
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                // Deadline fired: converge on the same stop path as the
                // manual toggle. A stop that raced with it is a no-op.
                finish_and_submit(&mut panel, &pipeline);
                sync_display(&panel, &window, icon_tray.as_ref());
            }
            Event::WindowEvent {
                event: WindowEvent::DroppedFile(path),
                ..
            } => {
                if panel.select_file(&path) {
                    player.stop();
                    sync_display(&panel, &window, icon_tray.as_ref());
                }
            }
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                icon_tray.take();
                *control_flow = ControlFlow::Exit;
            }
            Event::UserEvent(event) => {
                match event {
                    ChirpEvent::PredictionReady { seq, label } => {
                        if panel.resolve_success(seq, label.clone()) {
                            notify("result", &label);
                        }
                    }
                    ChirpEvent::PredictionFailed { seq } => {
                        if panel.resolve_failure(seq) {
                            notify("result", CLASSIFY_FAILED);
                        }
                    }
                }
                sync_display(&panel, &window, icon_tray.as_ref());
            }
            _ => {}
        }

        if let Ok(event) = menu_channel.try_recv() {
            if event.id == item_quit.id() {
                icon_tray.take();
                *control_flow = ControlFlow::Exit;
            } else if event.id == item_record.id() {
                toggle_recording(&mut panel, &recorder, &pipeline, record_limit);
                sync_display(&panel, &window, icon_tray.as_ref());
            } else if event.id == item_classify.id() {
                submit_selection(&mut panel, &pipeline);
                sync_display(&panel, &window, icon_tray.as_ref());
            } else if event.id == item_play.id() {
                match panel.preview() {
                    Some(preview) => player.play(preview),
                    None => debug!("No preview to play"),
                }
            } else if event.id == item_clear.id() {
                player.stop();
                panel.clear();
                sync_display(&panel, &window, icon_tray.as_ref());
            } else if event.id == item_copy_result.id() {
                match panel.last_label() {
                    Some(label) => {
                        if let Err(e) = clipboard.set_text(label.to_owned()) {
                            error!("Failed to copy result to clipboard: {}", e);
                        }
                    }
                    None => debug!("No result to copy"),
                }
            } else if event.id == item_copy_config.id() {
                if let Err(e) =
                    clipboard.set_text(config_manager.config_path().to_string_lossy().into_owned())
                {
                    error!("Failed to copy config path to clipboard: {}", e);
                }
            }
        }

        #[expect(clippy::redundant_pattern_matching)]
        if let Ok(_) = tray_channel.try_recv() {
            // Handle tray icon events
        }

        // Handle hotkey events
        if let Ok(event) = hotkey_channel.try_recv() {
            if event.id() == hotkey.id() && event.state() == HotKeyState::Pressed {
                toggle_recording(&mut panel, &recorder, &pipeline, record_limit);
                sync_display(&panel, &window, icon_tray.as_ref());
            }
        }

        // Arm the deadline timer after handling, so a session started in
        // this very iteration wakes the loop at its bound.
        if *control_flow != ControlFlow::Exit {
            if let Some(deadline) = panel.deadline() {
                *control_flow = ControlFlow::WaitUntil(deadline);
            }
        }
    });
}

/// One trigger, two phases: stop an active session and start one
/// otherwise. Start failures (no device, permission refused) are logged at
/// error level, which also surfaces them as a notification; the panel
/// stays out of the recording state.
fn toggle_recording(
    panel: &mut AcquisitionPanel,
    recorder: &Recorder,
    pipeline: &ClassifyPipeline,
    record_limit: std::time::Duration,
) {
    if panel.is_recording() {
        finish_and_submit(panel, pipeline);
    } else {
        match recorder.start_recording() {
            Ok(handle) => {
                panel.begin_recording(Box::new(handle), record_limit);
            }
            Err(e) => error!("Failed to start recording: {}", e),
        }
    }
}

/// Shared stop path for the manual toggle and the deadline expiry: a
/// finished capture becomes the selection and is submitted immediately.
fn finish_and_submit(panel: &mut AcquisitionPanel, pipeline: &ClassifyPipeline) {
    if panel.stop_recording() {
        submit_selection(panel, pipeline);
    }
}

/// The single submission contract both acquisition paths call into.
fn submit_selection(panel: &mut AcquisitionPanel, pipeline: &ClassifyPipeline) {
    let Some(submission) = panel.submit() else {
        return;
    };
    let seq = submission.seq;
    if let Err(e) = pipeline.submit(submission) {
        error!("Failed to dispatch submission: {}", e);
        panel.resolve_failure(seq);
    }
}

fn sync_display(panel: &AcquisitionPanel, window: &Window, tray: Option<&TrayIcon>) {
    window.set_title(&format!("{} - {}", APP_NAME_PRETTY, panel.status_line()));
    if let Some(tray) = tray {
        tray.set_icon(Some(panel.indicator().icon())).ok();
    }
}
