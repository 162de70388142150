use std::time::Duration;

use crate::correlator::{self, Response};
use crate::error::Result;
use crate::nav::{Fold, Navigator};
use crate::params::{Item, ParamTree};
use crate::status::Status;
use crate::transport::LineLink;

/// Response deadlines for engine commands.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// `set_param`, `record ...`, `save_params`.
    pub command: Duration,
    /// `list_params`, `reload_instruments`, `clear_instruments` and friends.
    pub long: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command: Duration::from_secs(1),
            long: Duration::from_secs(5),
        }
    }
}

/// User intents, decoupled from the key codes that produce them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    MoveBy(isize),
    MoveToStart,
    MoveToEnd,
    Fold(Fold),
    /// Toggle the selected group, or start/stop recording on anything else.
    Activate,
    /// Step the selected parameter by this many steps.
    Adjust(f64),
    ClearInstruments,
    ReloadInstruments,
    SaveParams,
    LoadParams,
    ResetParams,
    Quit,
}

/// Client-side state of one connection to the engine: the parameter tree,
/// the navigation over it, and the recording flag.
pub struct Session<'a, L: LineLink + ?Sized> {
    link: &'a L,
    timeouts: Timeouts,
    tree: ParamTree,
    nav: Navigator,
    recording: bool,
    status: Option<Status>,
    quit: bool,
}

impl<'a, L: LineLink + ?Sized> Session<'a, L> {
    /// Load the parameter list and pick up an already running recording.
    pub fn start(link: &'a L, timeouts: Timeouts, max_rows: usize) -> Result<Self> {
        let mut s = Session {
            link,
            timeouts,
            tree: ParamTree::default(),
            nav: Navigator::new(max_rows),
            recording: false,
            status: None,
            quit: false,
        };
        s.list_parameters()?;
        s.recording = s.query_recording()?;
        Ok(s)
    }

    pub fn tree(&self) -> &ParamTree {
        &self.tree
    }

    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    pub fn set_max_rows(&mut self, rows: usize) {
        self.nav.set_max_rows(rows);
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Apply one user action. Only timeouts and disconnects are returned as
    /// errors; everything else ends up in the status line.
    pub fn handle(&mut self, action: Action) -> Result<()> {
        self.status = None;

        match action {
            Action::MoveBy(delta) => self.nav.move_by(delta),
            Action::MoveToStart => self.nav.move_to_start(),
            Action::MoveToEnd => self.nav.move_to_end(),
            Action::Fold(op) => {
                self.nav.fold(&mut self.tree, op);
            }
            Action::Activate => {
                if matches!(self.nav.selected(&self.tree), Some(Item::Group(_))) {
                    self.nav.fold(&mut self.tree, Fold::Toggle);
                } else if self.recording {
                    self.stop_recording()?;
                } else {
                    self.start_recording()?;
                }
            }
            Action::Adjust(amount) => self.adjust_selected(amount)?,
            Action::ClearInstruments => self.clear_instruments()?,
            Action::ReloadInstruments => self.reload_instruments()?,
            Action::SaveParams => self.save_params()?,
            Action::LoadParams => self.refreshing_command("load_params")?,
            Action::ResetParams => self.refreshing_command("reset_params")?,
            Action::Quit => self.quit = true,
        }
        Ok(())
    }

    fn command(&self, command: &str, timeout: Duration) -> Result<Response> {
        correlator::send_command(self.link, command, timeout)
    }

    fn forget_tree(&mut self) {
        self.tree = ParamTree::default();
        self.nav.reset(&self.tree);
    }

    /// Fetch `list_params` and rebuild the tree from scratch. A rejected
    /// request or a bad record leaves the tree empty and sets the status.
    pub fn list_parameters(&mut self) -> Result<()> {
        self.forget_tree();

        let resp = self.command("list_params", self.timeouts.long)?;
        if !resp.is_ok() {
            self.status = Some(Status::from_token(&resp.status));
            return Ok(());
        }

        match ParamTree::from_lines(&resp.payload) {
            Ok(tree) => {
                log::info!("Loaded {} parameters", tree.parameters().len());
                self.tree = tree;
            }
            Err(e) if !e.is_fatal() => {
                log::warn!("Parameter list rejected: {e}");
                self.status = Some(Status::error(e.to_string()));
            }
            Err(e) => return Err(e),
        }
        self.nav.reset(&self.tree);
        Ok(())
    }

    fn query_recording(&mut self) -> Result<bool> {
        let resp = self.command("record status", self.timeouts.command)?;
        let active = resp.is_ok()
            && resp
                .payload
                .first()
                .is_some_and(|l| l == "recording" || l == "running");
        if active {
            log::info!("Engine is already recording");
        }
        Ok(active)
    }

    fn adjust_selected(&mut self, amount: f64) -> Result<()> {
        let Some(param) = self.nav.adjust(&mut self.tree, amount) else {
            return Ok(());
        };
        let command = param.set_command();
        // The local value stays as set even if the engine refuses it.
        let resp = self.command(&command, self.timeouts.command)?;
        if !resp.is_ok() {
            self.status = Some(Status::from_token(&resp.status));
        }
        Ok(())
    }

    fn clear_instruments(&mut self) -> Result<()> {
        self.forget_tree();
        let resp = self.command("clear_instruments", self.timeouts.long)?;
        self.status = Some(Status::from_token(&resp.status));
        Ok(())
    }

    fn reload_instruments(&mut self) -> Result<()> {
        self.forget_tree();
        let resp = self.command("reload_instruments", self.timeouts.long)?;
        self.status = Some(Status::from_token(&resp.status));
        if !resp.is_ok() {
            return Ok(());
        }
        self.list_parameters()
    }

    fn start_recording(&mut self) -> Result<()> {
        let resp = self.command("record start", self.timeouts.command)?;
        if resp.status.starts_with("OK") {
            self.recording = true;
            if let Some(file) = resp.payload.first() {
                log::info!("Recording to {file}");
                self.status = Some(Status::success(format!("recording to {file}")));
            }
        } else {
            self.status = Some(Status::from_token(&resp.status));
        }
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        let resp = self.command("record stop", self.timeouts.command)?;
        if resp.status.starts_with("OK") {
            self.recording = false;
        } else {
            self.status = Some(Status::from_token(&resp.status));
        }
        Ok(())
    }

    fn save_params(&mut self) -> Result<()> {
        let resp = self.command("save_params", self.timeouts.long)?;
        self.status = Some(Status::from_token(&resp.status));
        Ok(())
    }

    /// Commands that change values engine-side; re-list so the display matches.
    fn refreshing_command(&mut self, command: &str) -> Result<()> {
        let resp = self.command(command, self.timeouts.long)?;
        let status = Status::from_token(&resp.status);
        if resp.is_ok() {
            self.list_parameters()?;
        }
        if self.status.is_none() {
            self.status = Some(status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::testing::ScriptedLink;
    use crate::error::Error;

    const CATALOGUE: &[&str] = &[
        "lead.vco.freq,440,NUMBER,20,2000,1,Oscillator frequency",
        "lead.vco.wave,saw(1),CHOICE,sine;saw;square,Waveform",
        "lead.gain,0.5,NUMBER,0,1,0.25,Gain",
        "bass.gain,0.005,NUMBER,0,1,0.01,Gain",
        "bass.vcf.cutoff,1000,NUMBER,20,20000,10,Cutoff",
        "OK",
    ];

    fn quick() -> Timeouts {
        Timeouts {
            command: Duration::from_millis(50),
            long: Duration::from_millis(50),
        }
    }

    fn started(link: &ScriptedLink) -> Session<'_, ScriptedLink> {
        link.reply("list_params", CATALOGUE);
        link.reply("record status", &["stopped", "OK"]);
        Session::start(link, quick(), 10).unwrap()
    }

    fn selected_name<L: LineLink + ?Sized>(s: &Session<'_, L>) -> String {
        s.nav().selected(s.tree()).unwrap().name().to_string()
    }

    #[test]
    fn startup_lists_parameters() {
        let link = ScriptedLink::new();
        let s = started(&link);
        assert_eq!(link.sent(), vec!["list_params", "record status"]);
        assert!(!s.is_recording());
        // root: bass, lead (both folded)
        assert_eq!(s.nav().view().len(), 2);
        assert_eq!(selected_name(&s), "bass");
    }

    #[test]
    fn startup_picks_up_active_recording() {
        for marker in ["recording", "running"] {
            let link = ScriptedLink::new();
            link.reply("list_params", CATALOGUE);
            link.reply("record status", &[marker, "/tmp/take.wav", "OK"]);
            let s = Session::start(&link, quick(), 10).unwrap();
            assert!(s.is_recording(), "{marker}");
        }
    }

    #[test]
    fn adjust_pushes_value_by_reference() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        s.handle(Action::Fold(Fold::Unfold)).unwrap();
        s.handle(Action::MoveBy(1)).unwrap();
        assert_eq!(selected_name(&s), "gain");

        link.reply("set_param bass.gain 0", &["OK"]);
        s.handle(Action::Adjust(-1.0)).unwrap();
        assert_eq!(link.sent().last().unwrap(), "set_param bass.gain 0");
        assert!(s.status().is_none());
    }

    #[test]
    fn rejected_value_is_kept_locally() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        s.handle(Action::MoveToEnd).unwrap();
        s.handle(Action::Fold(Fold::Unfold)).unwrap();
        // bass, lead, gain, vco
        s.handle(Action::MoveBy(1)).unwrap();
        assert_eq!(selected_name(&s), "gain");

        link.reply("set_param lead.gain 0.75", &["ERR:Parameter locked"]);
        s.handle(Action::Adjust(1.0)).unwrap();
        let status = s.status().unwrap();
        assert_eq!(status.message, "Error: Parameter locked");
        assert!(!status.ok);

        let value = s.nav().selected(s.tree()).unwrap().as_param().unwrap().value;
        assert_eq!(value, 0.75);
    }

    #[test]
    fn activate_toggles_group_or_recording() {
        let link = ScriptedLink::new();
        let mut s = started(&link);

        s.handle(Action::Activate).unwrap();
        // bass, gain, vcf.cutoff, lead
        assert_eq!(s.nav().view().len(), 4);

        s.handle(Action::MoveBy(1)).unwrap();
        link.reply("record start", &["/tmp/rec_0001.wav", "OK"]);
        s.handle(Action::Activate).unwrap();
        assert!(s.is_recording());
        assert_eq!(
            s.status().unwrap().message,
            "Success: recording to /tmp/rec_0001.wav"
        );

        link.reply("record stop", &["OK"]);
        s.handle(Action::Activate).unwrap();
        assert!(!s.is_recording());
        assert!(s.status().is_none());
    }

    #[test]
    fn failed_stop_keeps_recording() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        s.handle(Action::Fold(Fold::Unfold)).unwrap();
        s.handle(Action::MoveBy(1)).unwrap();
        link.reply("record start", &["/tmp/a.wav", "OK"]);
        s.handle(Action::Activate).unwrap();
        link.reply("record stop", &["ERR:Already stopped"]);
        s.handle(Action::Activate).unwrap();
        assert!(s.is_recording());
        assert_eq!(s.status().unwrap().message, "Error: Already stopped");
    }

    #[test]
    fn clear_empties_tree() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        link.reply("clear_instruments", &["OK"]);
        s.handle(Action::ClearInstruments).unwrap();
        assert!(s.tree().is_empty());
        assert!(s.nav().view().is_empty());
        assert_eq!(s.nav().selection(), None);
        assert_eq!(s.status().unwrap().message, "Success: OK");
    }

    #[test]
    fn reload_rebuilds_tree_and_resets_folds() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        s.handle(Action::Fold(Fold::Unfold)).unwrap();
        assert_eq!(s.nav().view().len(), 4);

        link.reply("reload_instruments", &["OK"]);
        link.reply("list_params", CATALOGUE);
        s.handle(Action::ReloadInstruments).unwrap();
        assert_eq!(s.nav().view().len(), 2);
        assert_eq!(s.status().unwrap().message, "Success: OK");
    }

    #[test]
    fn failed_reload_leaves_empty_tree() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        link.reply("reload_instruments", &["ERR:Bad config"]);
        s.handle(Action::ReloadInstruments).unwrap();
        assert!(s.tree().is_empty());
        assert_eq!(s.status().unwrap().message, "Error: Bad config");
        assert_eq!(link.sent().last().unwrap(), "reload_instruments");
    }

    #[test]
    fn malformed_catalogue_is_a_status_not_a_crash() {
        let link = ScriptedLink::new();
        link.reply("list_params", &["lead.gain,0.5,NUMBER,0,1,0.01,Gain", "lead.x,1,BLOB,z", "OK"]);
        link.reply("record status", &["stopped", "OK"]);
        let s = Session::start(&link, quick(), 10).unwrap();
        assert!(s.tree().is_empty());
        assert!(s.status().unwrap().message.starts_with("Error: unsupported parameter type"));
    }

    #[test]
    fn rejected_listing_sets_status() {
        let link = ScriptedLink::new();
        link.reply("list_params", &["ERR:Busy"]);
        link.reply("record status", &["stopped", "OK"]);
        let s = Session::start(&link, quick(), 10).unwrap();
        assert!(s.tree().is_empty());
        assert_eq!(s.status().unwrap().message, "Error: Busy");
    }

    #[test]
    fn load_params_relists() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        link.reply("load_params", &["OK"]);
        link.reply("list_params", CATALOGUE);
        s.handle(Action::LoadParams).unwrap();
        assert_eq!(
            link.sent()[2..].to_vec(),
            vec!["load_params".to_string(), "list_params".to_string()]
        );
        assert_eq!(s.status().unwrap().message, "Success: OK");
    }

    #[test]
    fn rejected_reset_does_not_relist() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        link.reply("reset_params", &["ERR:Invalid syntax"]);
        s.handle(Action::ResetParams).unwrap();
        assert_eq!(link.sent().last().unwrap(), "reset_params");
        assert_eq!(s.nav().view().len(), 2);
    }

    #[test]
    fn timeout_is_fatal() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        let err = s.handle(Action::SaveParams).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn status_clears_on_next_action() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        link.reply("save_params", &["OK"]);
        s.handle(Action::SaveParams).unwrap();
        assert!(s.status().is_some());
        s.handle(Action::MoveBy(1)).unwrap();
        assert!(s.status().is_none());
    }

    #[test]
    fn quit() {
        let link = ScriptedLink::new();
        let mut s = started(&link);
        assert!(!s.should_quit());
        s.handle(Action::Quit).unwrap();
        assert!(s.should_quit());
    }
}
