use std::sync::mpsc;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tray_icon::menu::{AboutMetadataBuilder, Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIconBuilder, TrayIconEvent};

use sotto::event::SottoEvent;
use sotto::icon::StateIcon;
use sotto::notify::{notify, NotificationLayer};
use sotto::process::{AudioPipeline, SubmitResult};
use sotto::{
    clipboard, spawn_paste_task, ConfigManager, HookEngine, HotkeyEvent, MicState, PasteJob,
    Recorder, RecordingHandle, WindowHandle, DEFAULT_LOG_LEVEL, VERSION,
};
use sotto_hotkey::keys::binding_label;

fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SOTTO_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .finish()
        .with(NotificationLayer::new())
        .init();

    // Load config
    let config_manager = ConfigManager::new()?;
    let config = Arc::new(RwLock::new(config_manager.load()?));
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config.read())?;

    // Set up the hotkey engine. An install failure means dictation by hotkey
    // is unavailable for this run; the rest of the app keeps working.
    let (hotkey_tx, hotkey_rx) = mpsc::channel();
    let hook_engine = HookEngine::new(config.read().hotkey(), hotkey_tx);
    if let Err(e) = hook_engine.start() {
        error!("Dictation hotkey unavailable: {}", e);
    }

    // Set up recorder and the paste worker
    let recorder = Recorder::new();
    let mut active_recording: Option<RecordingHandle> = None;
    // The window that receives the transcript, captured when the hotkey fired.
    let mut paste_target: Option<WindowHandle> = None;
    let paste_sender = spawn_paste_task();

    // Create the tray menu
    let tray_menu = Menu::new();
    let icon_quit = MenuItem::new("Quit", true, None);
    let icon_copy_config = MenuItem::new("Copy config path", true, None);
    let icon_rebind = MenuItem::new("Change hotkey\u{2026}", true, None);
    tray_menu.append_items(&[
        // the name of the app
        &MenuItem::new("Sotto", false, None),
        &PredefinedMenuItem::separator(),
        &PredefinedMenuItem::about(
            None,
            Some(
                AboutMetadataBuilder::new()
                    .version(Some(VERSION.to_owned()))
                    .build(),
            ),
        ),
        &icon_rebind,
        &icon_copy_config,
        &PredefinedMenuItem::separator(),
        &icon_quit,
    ])?;

    // Set up the event loop
    let mut icon_tray = None;

    let menu_channel = MenuEvent::receiver();
    let tray_channel = TrayIconEvent::receiver();

    let event_loop: EventLoop<SottoEvent> = EventLoopBuilder::with_user_event().build();
    let event_sender = event_loop.create_proxy();

    // Relay hook events into the event loop; the proxy send wakes it.
    {
        let proxy = event_loop.create_proxy();
        std::thread::spawn(move || {
            while let Ok(event) = hotkey_rx.recv() {
                if proxy.send_event(SottoEvent::Hotkey(event)).is_err() {
                    break;
                }
            }
        });
    }

    // Set up processor for handling audio data async operations
    let audio_pipeline = AudioPipeline::new(config.clone(), event_sender.clone())?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        if let Event::NewEvents(StartCause::Init) = event {
            // We create the icon once the event loop is actually running
            // to prevent issues like https://github.com/tauri-apps/tray-icon/issues/90

            icon_tray.replace(
                TrayIconBuilder::new()
                    .with_menu(Box::new(tray_menu.clone()))
                    .with_tooltip("sotto - speech to text")
                    .with_icon(MicState::Idle.icon())
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

            info!(hotkey = %binding_label(&hook_engine.binding()), "Sotto ready");
        }

        if let Ok(event) = menu_channel.try_recv() {
            if event.id == icon_quit.id() {
                hook_engine.stop();
                icon_tray.take();
                *control_flow = ControlFlow::Exit;
            } else if event.id == icon_copy_config.id() {
                if let Err(e) =
                    clipboard::copy_text(&config_manager.config_path().to_string_lossy())
                {
                    error!("Failed to copy config path to clipboard: {}", e);
                }
            } else if event.id == icon_rebind.id() {
                if hook_engine.is_recording() {
                    hook_engine.cancel_recording();
                    info!("Hotkey recording cancelled");
                } else {
                    hook_engine.start_recording();
                    notify("hotkey", "Press the new combination now");
                }
            }
        }

        #[expect(clippy::redundant_pattern_matching)]
        if let Ok(_) = tray_channel.try_recv() {
            // Handle tray icon events
        }

        // Handle user provided events
        if let Event::UserEvent(event) = event {
            match event {
                SottoEvent::StateChanged(state) => {
                    info!(state = ?state, "State changed");
                    icon_tray.as_ref().map(|i| i.set_icon(Some(state.icon())));
                }
                SottoEvent::TranscriptReady(transcription) => {
                    // Set the state to idle so it goes back to being inactive
                    // after this transcription
                    event_sender
                        .send_event(SottoEvent::StateChanged(MicState::Idle))
                        .ok();

                    let (auto_paste, restore_clipboard) = {
                        let config = config.read();
                        (config.auto_paste, config.restore_clipboard)
                    };
                    info!(
                        auto_paste = auto_paste,
                        restore_clipboard = restore_clipboard,
                        language = ?transcription.language,
                        took = ?transcription.duration,
                        "Handling transcription"
                    );
                    let previous = if auto_paste && restore_clipboard {
                        match clipboard::read_text() {
                            Ok(text) => Some(text),
                            Err(e) => {
                                warn!("Failed to get clipboard text: {}", e);
                                None
                            }
                        }
                    } else {
                        None
                    };

                    // Copy the transcription to the clipboard
                    if let Err(e) = clipboard::copy_text(&transcription.text) {
                        warn!("Failed to set clipboard text: {}", e);
                    }

                    if auto_paste {
                        // Paste into the window that had focus when the
                        // hotkey fired; the worker restores the previous
                        // clipboard once the paste has settled.
                        let target = paste_target.take().unwrap_or(WindowHandle::NULL);
                        if paste_sender
                            .send(PasteJob {
                                target,
                                restore: previous,
                            })
                            .is_err()
                        {
                            warn!("Paste worker is gone; transcription left on clipboard");
                        }
                    }
                }
                SottoEvent::AudioError(_) => {
                    warn!("Transcription failed; recording was dropped");
                }
                SottoEvent::Hotkey(hotkey_event) => {
                    let mic_state = match hotkey_event {
                        HotkeyEvent::Pressed { target } => {
                            let push_to_talk = config.read().push_to_talk;
                            if active_recording.is_some() {
                                if push_to_talk {
                                    // Key repeat or a second press while held;
                                    // nothing to do.
                                    None
                                } else {
                                    // Toggle mode: a press while recording stops.
                                    Some(stop_and_submit(&mut active_recording, &audio_pipeline))
                                }
                            } else {
                                paste_target = Some(target);
                                let proxy = event_sender.clone();
                                match recorder.start_recording(move || {
                                    proxy
                                        .send_event(SottoEvent::StateChanged(MicState::Active))
                                        .ok();
                                }) {
                                    Ok(handle) => {
                                        active_recording = Some(handle);
                                        Some(MicState::Activating)
                                    }
                                    Err(e) => {
                                        error!("Failed to start recording: {:?}", e);
                                        paste_target = None;
                                        Some(MicState::Idle)
                                    }
                                }
                            }
                        }
                        HotkeyEvent::Released => {
                            if config.read().push_to_talk && active_recording.is_some() {
                                Some(stop_and_submit(&mut active_recording, &audio_pipeline))
                            } else {
                                None
                            }
                        }
                        HotkeyEvent::Recorded { binding, label } => {
                            info!(hotkey = %label, "Hotkey recorded");
                            hook_engine.set_binding(binding);
                            config.write().hotkey = binding;
                            if let Err(e) = config_manager.save(&config.read()) {
                                error!("Failed to save config: {:?}", e);
                            }
                            notify("hotkey", &format!("Hotkey set to {}", label));
                            None
                        }
                    };
                    if let Some(mic_state) = mic_state {
                        event_sender
                            .send_event(SottoEvent::StateChanged(mic_state))
                            .ok();
                    }
                }
            };
        }
    });
}

/// Finish the active recording, if any, and hand it to the pipeline.
fn stop_and_submit(
    active_recording: &mut Option<RecordingHandle>,
    audio_pipeline: &AudioPipeline,
) -> MicState {
    match active_recording.take() {
        Some(mut recording) => match recording.finish() {
            Ok(Some(data)) => match audio_pipeline.submit(data) {
                Ok(SubmitResult::Discarded) => MicState::Idle,
                Ok(SubmitResult::Sent) => MicState::Processing,
                Err(e) => {
                    error!("Failed to submit audio to processor: {:?}", e);
                    MicState::Idle
                }
            },
            Ok(None) => {
                warn!("Recording finished but no data was recorded");
                MicState::Idle
            }
            Err(e) => {
                error!(error = ?e, "Failed to finish recording");
                MicState::Idle
            }
        },
        None => MicState::Idle,
    }
}
