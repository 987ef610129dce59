use crate::action::Action;
use crate::backend::Backend;
use crate::error::Result;
use crate::keys::{format_steps, is_modifier_keysym, parse_pattern, vt_for_keysym, KeyStep, Modifiers};
use crate::server::Server;

/// A key sequence bound to an action. Removed bindings are only marked
/// inactive so indices held by an in-flight match stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordBinding {
    pub steps: Vec<KeyStep>,
    pub action: Action,
    pub active: bool,
}

impl ChordBinding {
    pub fn new(steps: Vec<KeyStep>, action: Action) -> Self {
        Self {
            steps,
            action,
            active: true,
        }
    }

    pub fn pattern(&self) -> String {
        format_steps(&self.steps)
    }

    fn starts_with(&self, prefix: &[KeyStep]) -> bool {
        self.active && self.steps.len() >= prefix.len() && self.steps[..prefix.len()] == *prefix
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordOutcome {
    /// A bare modifier press. Consumed only while a chord is in progress.
    Modifier { handled: bool },
    /// The step extended a strict prefix of some binding.
    Pending,
    /// The step finished the binding at this index.
    Complete(usize),
    /// A chord was in progress and the step matched nothing. The progress is
    /// dropped and the key swallowed.
    Aborted,
    /// No chord in progress and nothing starts with this step.
    Unmatched,
}

impl ChordOutcome {
    pub fn is_handled(self) -> bool {
        match self {
            ChordOutcome::Modifier { handled } => handled,
            ChordOutcome::Unmatched => false,
            _ => true,
        }
    }
}

/// Tracks the steps typed so far. Between calls the buffer is always empty
/// or a strict prefix of at least one active binding.
#[derive(Debug, Default, Clone)]
pub struct ChordMatcher {
    progress: Vec<KeyStep>,
}

impl ChordMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bindings: &[ChordBinding], step: KeyStep) -> ChordOutcome {
        if is_modifier_keysym(step.keysym) {
            return ChordOutcome::Modifier {
                handled: !self.progress.is_empty(),
            };
        }

        let in_progress = !self.progress.is_empty();
        self.progress.push(step);

        let mut prefix_of_longer = false;
        for (index, binding) in bindings.iter().enumerate() {
            if !binding.starts_with(&self.progress) {
                continue;
            }
            if binding.steps.len() == self.progress.len() {
                self.progress.clear();
                return ChordOutcome::Complete(index);
            }
            prefix_of_longer = true;
        }

        if prefix_of_longer {
            return ChordOutcome::Pending;
        }

        self.progress.clear();
        if in_progress {
            ChordOutcome::Aborted
        } else {
            ChordOutcome::Unmatched
        }
    }

    pub fn reset(&mut self) {
        self.progress.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.progress.is_empty()
    }

    /// Drops progress that no longer leads anywhere after `bindings` changed.
    pub fn revalidate(&mut self, bindings: &[ChordBinding]) {
        if self.progress.is_empty() {
            return;
        }
        let still_live = bindings
            .iter()
            .any(|b| b.starts_with(&self.progress) && b.steps.len() > self.progress.len());
        if !still_live {
            self.progress.clear();
        }
    }

    pub fn progress(&self) -> &[KeyStep] {
        &self.progress
    }

    /// Progress so far, e.g. `S-x C-a`, for status display.
    pub fn display(&self) -> String {
        format_steps(&self.progress)
    }
}

impl Server {
    /// Registers `pattern`, replacing any active binding with the same steps.
    /// A parse failure leaves existing bindings untouched.
    pub fn bind<S: AsRef<str>>(&mut self, pattern: &str, args: &[S]) -> Result<()> {
        let steps = parse_pattern(pattern)?;
        let action = Action::create(args)?;

        for binding in self.bindings.iter_mut().filter(|b| b.active && b.steps == steps) {
            binding.active = false;
        }
        if self.chord.is_idle() {
            self.bindings.retain(|b| b.active);
        }

        log::debug!("[chord] Bound {} to {}", format_steps(&steps), action);
        self.bindings.push(ChordBinding::new(steps, action));
        self.chord.revalidate(&self.bindings);
        Ok(())
    }

    /// Returns whether an active binding was removed.
    pub fn unbind(&mut self, pattern: &str) -> Result<bool> {
        let steps = parse_pattern(pattern)?;
        let mut removed = false;
        for binding in self.bindings.iter_mut().filter(|b| b.active && b.steps == steps) {
            binding.active = false;
            removed = true;
        }
        if removed {
            log::debug!("[chord] Unbound {}", format_steps(&steps));
            self.chord.revalidate(&self.bindings);
        }
        Ok(removed)
    }

    pub fn binding(&self, pattern: &str) -> Result<Option<&Action>> {
        let steps = parse_pattern(pattern)?;
        Ok(self
            .bindings
            .iter()
            .find(|b| b.active && b.steps == steps)
            .map(|b| &b.action))
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ChordBinding> {
        self.bindings.iter().filter(|b| b.active)
    }

    pub fn chord_progress(&self) -> String {
        self.chord.display()
    }

    /// Feeds one key press through the chord matcher. Returns true when the
    /// key must not be forwarded to the focused client.
    pub fn handle_key(&mut self, backend: &mut dyn Backend, keysym: u32, modifiers: Modifiers) -> bool {
        let step = KeyStep::new(modifiers, keysym);
        let before = self.chord.display();
        let outcome = self.chord.feed(&self.bindings, step);

        let after = self.chord.display();
        if after != before {
            backend.on_chord_changed(&after);
        }

        if let ChordOutcome::Complete(index) = outcome {
            if let Some(action) = self.bindings.get(index).map(|b| b.action.clone()) {
                action.execute(self, backend);
            }
        }

        if outcome.is_handled() {
            return true;
        }

        if step.modifiers == Modifiers::CTRL | Modifiers::ALT && backend.can_switch_vt() {
            if let Some(vt) = vt_for_keysym(keysym) {
                log::info!("[chord] Switching to VT {}", vt);
                backend.switch_vt(vt);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xkbcommon::xkb::keysyms::{KEY_Return, KEY_Shift_L, KEY_a, KEY_b, KEY_x};

    fn binding(pattern: &str, args: &[&str]) -> ChordBinding {
        ChordBinding::new(parse_pattern(pattern).unwrap(), Action::create(args).unwrap())
    }

    fn step(mods: Modifiers, keysym: u32) -> KeyStep {
        KeyStep::new(mods, keysym)
    }

    #[test]
    fn single_step_completes() {
        let bindings = vec![binding("S-Return", &["spawn", "foot"])];
        let mut matcher = ChordMatcher::new();
        assert_eq!(
            matcher.feed(&bindings, step(Modifiers::SUPER, KEY_Return)),
            ChordOutcome::Complete(0)
        );
        assert!(matcher.is_idle());
    }

    #[test]
    fn two_step_chord() {
        let bindings = vec![
            binding("S-x a", &["focus_next"]),
            binding("S-x b", &["focus_prev"]),
        ];
        let mut matcher = ChordMatcher::new();

        assert_eq!(
            matcher.feed(&bindings, step(Modifiers::SUPER, KEY_x)),
            ChordOutcome::Pending
        );
        assert_eq!(matcher.display(), "S-x");
        assert_eq!(
            matcher.feed(&bindings, step(Modifiers::NONE, KEY_b)),
            ChordOutcome::Complete(1)
        );
        assert_eq!(matcher.display(), "");
    }

    #[test]
    fn modifiers_are_ignored_but_swallowed_mid_chord() {
        let bindings = vec![binding("S-x a", &["zoom"])];
        let mut matcher = ChordMatcher::new();

        let shift = step(Modifiers::NONE, KEY_Shift_L);
        assert_eq!(
            matcher.feed(&bindings, shift),
            ChordOutcome::Modifier { handled: false }
        );

        matcher.feed(&bindings, step(Modifiers::SUPER, KEY_x));
        let outcome = matcher.feed(&bindings, shift);
        assert_eq!(outcome, ChordOutcome::Modifier { handled: true });
        assert!(outcome.is_handled());
        assert_eq!(matcher.progress().len(), 1);
    }

    #[test]
    fn wrong_continuation_aborts_and_swallows() {
        let bindings = vec![binding("S-x a", &["zoom"])];
        let mut matcher = ChordMatcher::new();

        matcher.feed(&bindings, step(Modifiers::SUPER, KEY_x));
        let outcome = matcher.feed(&bindings, step(Modifiers::NONE, KEY_b));
        assert_eq!(outcome, ChordOutcome::Aborted);
        assert!(outcome.is_handled());
        assert!(matcher.is_idle());

        let outcome = matcher.feed(&bindings, step(Modifiers::NONE, KEY_b));
        assert_eq!(outcome, ChordOutcome::Unmatched);
        assert!(!outcome.is_handled());
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let bindings = vec![binding("S-a", &["zoom"])];
        let mut matcher = ChordMatcher::new();
        assert_eq!(
            matcher.feed(&bindings, step(Modifiers::SUPER | Modifiers::SHIFT, KEY_a)),
            ChordOutcome::Unmatched
        );
    }

    #[test]
    fn inactive_bindings_never_match() {
        let mut bindings = vec![binding("S-a", &["zoom"])];
        bindings[0].active = false;
        let mut matcher = ChordMatcher::new();
        assert_eq!(
            matcher.feed(&bindings, step(Modifiers::SUPER, KEY_a)),
            ChordOutcome::Unmatched
        );
    }

    #[test]
    fn revalidate_drops_dead_progress() {
        let mut bindings = vec![binding("S-x a", &["zoom"])];
        let mut matcher = ChordMatcher::new();
        matcher.feed(&bindings, step(Modifiers::SUPER, KEY_x));

        matcher.revalidate(&bindings);
        assert!(!matcher.is_idle());

        bindings[0].active = false;
        matcher.revalidate(&bindings);
        assert!(matcher.is_idle());
    }

    use crate::backend::testing::{Call, RecordingBackend};
    use xkbcommon::xkb::keysyms::{KEY_Super_L, KEY_XF86Switch_VT_3};

    fn server_with(bindings: &[(&str, &str)]) -> Server {
        let mut server = Server::new();
        for (pattern, args) in bindings {
            let args: Vec<&str> = args.split_whitespace().collect();
            server.bind(pattern, &args).unwrap();
        }
        server
    }

    #[test]
    fn full_sequence_fires_once_despite_modifier_noise() {
        let mut server = server_with(&[("S-x C-a", "spawn foot")]);
        let mut backend = RecordingBackend::new();

        let keys = [
            (Modifiers::NONE, KEY_Super_L),
            (Modifiers::SUPER, KEY_x),
            (Modifiers::SUPER, KEY_Shift_L),
            (Modifiers::NONE, KEY_Super_L),
            (Modifiers::CTRL, KEY_a),
        ];
        for (mods, keysym) in keys {
            server.handle_key(&mut backend, keysym, mods);
        }

        assert_eq!(backend.spawned(), vec![vec!["foot".to_string()]]);
        assert!(server.chord.is_idle());
        assert_eq!(backend.chord_events, vec!["S-x".to_string(), String::new()]);
    }

    #[test]
    fn strict_prefix_stays_pending_and_swallows() {
        let mut server = server_with(&[("S-x a b", "zoom")]);
        let mut backend = RecordingBackend::new();

        assert!(server.handle_key(&mut backend, KEY_x, Modifiers::SUPER));
        assert!(server.handle_key(&mut backend, KEY_a, Modifiers::NONE));
        assert!(server.handle_key(&mut backend, KEY_Shift_L, Modifiers::NONE));
        assert_eq!(server.chord_progress(), "S-x a");
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn unbound_keys_pass_through() {
        let mut server = server_with(&[("S-Return", "spawn foot")]);
        let mut backend = RecordingBackend::new();
        assert!(!server.handle_key(&mut backend, KEY_a, Modifiers::NONE));
        assert!(!server.handle_key(&mut backend, KEY_Shift_L, Modifiers::NONE));
        assert!(backend.chord_events.is_empty());
    }

    #[test]
    fn vt_switch_needs_exact_ctrl_alt() {
        let mut server = Server::new();
        let mut backend = RecordingBackend::new();
        backend.vt_capable = true;

        let ctrl_alt = Modifiers::CTRL | Modifiers::ALT;
        assert!(!server.handle_key(&mut backend, KEY_XF86Switch_VT_3, ctrl_alt | Modifiers::SHIFT));
        assert!(server.handle_key(&mut backend, KEY_XF86Switch_VT_3, ctrl_alt));
        assert_eq!(backend.calls, vec![Call::SwitchVt(3)]);

        backend.vt_capable = false;
        assert!(!server.handle_key(&mut backend, KEY_XF86Switch_VT_3, ctrl_alt));
    }

    #[test]
    fn rebinding_replaces_and_unbinding_deactivates() {
        let mut server = server_with(&[
            ("S-Return", "spawn foot"),
            ("S-Return", "spawn alacritty"),
        ]);
        assert_eq!(server.bindings().count(), 1);
        assert_eq!(
            server.binding("S-Return").unwrap().map(|a| a.args()),
            Some(vec!["spawn".to_string(), "alacritty".to_string()])
        );

        assert!(server.unbind("S-Return").unwrap());
        assert!(!server.unbind("S-Return").unwrap());
        assert_eq!(server.binding("S-Return").unwrap(), None);
    }

    #[test]
    fn bad_binding_leaves_others_alone() {
        let mut server = server_with(&[("S-Return", "spawn foot")]);
        assert!(server.bind("Q-x", &["zoom"]).is_err());
        assert!(server.bind("S-x", &["nonsense"]).is_err());
        assert_eq!(server.bindings().count(), 1);
    }

    #[test]
    fn unbinding_mid_chord_resets_progress() {
        let mut server = server_with(&[("S-x a", "zoom")]);
        let mut backend = RecordingBackend::new();
        server.handle_key(&mut backend, KEY_x, Modifiers::SUPER);
        assert!(!server.chord.is_idle());

        server.unbind("S-x a").unwrap();
        assert!(server.chord.is_idle());
    }
}
