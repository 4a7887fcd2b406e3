use super::*;

impl DocViewer {
    /// Handles one `load` of the session's frame:
    /// `Probing → {Contained, Uncontained} → Visible`.
    ///
    /// Never fails. Whatever the probe or the containment steps run into,
    /// the indicator ends hidden and the frame revealed.
    pub fn handle_frame_load(&mut self, browser: &mut EmbeddedBrowser, event: FrameLoadEvent) {
        let marker = self.config.interceptor_marker.clone();
        let Some(session) = self.session_mut() else {
            self.trace
                .debug(format!("[load] ignoring load of {} without a session", event.frame));
            return;
        };
        if session.frame != event.frame {
            let current = session.frame;
            self.trace.debug(format!(
                "[load] ignoring stale load of {} (current frame {current})",
                event.frame
            ));
            return;
        }

        session.phase = LoadPhase::Probing;
        session.load_cycles += 1;
        let access = match browser.frame(event.frame) {
            Ok(frame) => probe_frame(frame),
            Err(_) => FrameAccess::Denied(AccessDenial::NoContent),
        };

        let mut lines = Vec::new();
        let outcome = match access {
            FrameAccess::Accessible(handles) => {
                session.phase = LoadPhase::Contained;
                let report = contain_declarative_navigation(&handles.document);
                let interceptor = install_navigation_interceptor(&handles, &marker);
                for failure in report.failures.iter().chain(interceptor.failures.iter()) {
                    lines.push((
                        TraceLevel::Warn,
                        format!("[containment] {} step failed: {failure}", event.frame),
                    ));
                }
                lines.push((
                    TraceLevel::Debug,
                    format!(
                        "[containment] {} {}: base={} anchors={} forms={} listener={}",
                        event.frame,
                        handles.window.id(),
                        report.base_targets_removed,
                        report.anchors_retargeted,
                        report.forms_retargeted,
                        if interceptor.already_installed {
                            "kept"
                        } else if interceptor.click_listener_installed {
                            "installed"
                        } else {
                            "missing"
                        }
                    ),
                ));
                LoadOutcome::Contained {
                    window: handles.window.id(),
                    report,
                    interceptor,
                }
            }
            FrameAccess::Denied(denial) => {
                session.phase = LoadPhase::Uncontained;
                lines.push((
                    TraceLevel::Warn,
                    format!(
                        "[containment] cannot access content of {} ({denial}); navigation won't be intercepted",
                        event.frame
                    ),
                ));
                LoadOutcome::Uncontained(denial)
            }
        };

        session.last_outcome = Some(outcome);
        session.indicator = IndicatorState::Hidden;
        session.phase = LoadPhase::Visible;
        if let Ok(frame) = browser.frame_mut(event.frame) {
            frame.set_hidden(false);
        }

        for (level, line) in lines {
            self.trace.record(level, line);
        }
    }
}
