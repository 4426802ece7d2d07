//! Timed score that plays the part of a control surface.
//!
//! One event per line: `<seconds> <action> [args]`. Blank lines and `#`
//! comments are ignored.
//!
//! ```text
//! 0.00 press a
//! 0.40 release a
//! 0.50 shape square
//! 0.50 gain 0.8
//! 0.50 balance 0.3
//! 0.60 chain Low Pass, Reverb
//! 0.60 param Reverb 0 0.6
//! 2.00 end
//! ```

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, bail};
use tracing::{debug, info};

use tsynth_backend::{ControlSurface, KeyEvent, SurfaceInput, UiSnapshot};
use tsynth_core::{BuiltinShape, SynthSettings};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Press(char),
    Release(char),
    Shape(BuiltinShape),
    Sample { bank: String, name: String },
    Gain(f32),
    Balance(f32),
    Chain(Vec<String>),
    Param { effect: String, index: usize, value: f32 },
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    pub at: f64,
    pub action: Action,
}

/// Two bars of arpeggios on the default key map, with a timbre change and
/// a reverb tail.
pub const DEMO: &str = "
0.00 chain Low Pass
0.00 press q
0.25 release q
0.25 press e
0.50 release e
0.50 press t
0.75 release t
0.75 press i
1.00 release i
1.00 shape square
1.00 gain 0.6
1.00 chain Low Pass, Reverb
1.00 press q
1.00 press t
1.50 release q
1.50 release t
1.50 shape plucked_string
1.50 press w
1.75 release w
1.75 press r
2.00 release r
2.00 balance 0.2
2.00 press u
2.50 release u
3.50 end
";

pub fn parse(text: &str) -> anyhow::Result<Vec<ScriptEvent>> {
    let mut events = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = parse_line(line).with_context(|| format!("line {}: '{line}'", number + 1))?;
        events.push(event);
    }
    // stable, so same-time events keep file order
    events.sort_by(|a, b| a.at.total_cmp(&b.at));
    Ok(events)
}

pub fn load(path: &Path) -> anyhow::Result<Vec<ScriptEvent>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse(&text)
}

fn parse_line(line: &str) -> anyhow::Result<ScriptEvent> {
    let mut words = line.splitn(3, char::is_whitespace);
    let at: f64 = words.next().unwrap_or_default().parse().context("bad time")?;
    let verb = words.next().context("missing action")?;
    let rest = words.next().unwrap_or_default().trim();

    let action = match verb {
        "press" => Action::Press(single_char(rest)?),
        "release" => Action::Release(single_char(rest)?),
        "shape" => Action::Shape(shape(rest)?),
        "sample" => {
            let (bank, name) = rest.split_once('/').context("expected bank/name")?;
            Action::Sample {
                bank: bank.trim().to_string(),
                name: name.trim().to_string(),
            }
        }
        "gain" => Action::Gain(rest.parse().context("bad gain")?),
        "balance" => Action::Balance(rest.parse().context("bad balance")?),
        "chain" => Action::Chain(
            rest.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        "param" => {
            // effect names may contain spaces, so index and value come last
            let mut tail = rest.rsplitn(3, char::is_whitespace);
            let value = tail.next().unwrap_or_default().parse().context("bad value")?;
            let index = tail.next().unwrap_or_default().parse().context("bad index")?;
            let effect = tail.next().context("missing effect")?.trim().to_string();
            Action::Param { effect, index, value }
        }
        "end" => Action::End,
        other => bail!("unknown action '{other}'"),
    };
    Ok(ScriptEvent { at, action })
}

fn single_char(text: &str) -> anyhow::Result<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => bail!("expected a single key, got '{text}'"),
    }
}

fn shape(text: &str) -> anyhow::Result<BuiltinShape> {
    let wanted = squash(text);
    BuiltinShape::ALL
        .into_iter()
        .find(|shape| squash(shape.name()) == wanted)
        .with_context(|| format!("unknown shape '{text}'"))
}

/// `Plucked String`, `plucked_string` and `pluckedstring` all compare equal.
fn squash(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Replays a score against the wall clock.
pub struct ScriptedSurface {
    events: Vec<ScriptEvent>,
    next: usize,
    pending: Vec<Action>,
    started: Option<Instant>,
    last_snapshot: Option<UiSnapshot>,
}

impl ScriptedSurface {
    pub fn new(events: Vec<ScriptEvent>) -> Self {
        Self {
            events,
            next: 0,
            pending: Vec::new(),
            started: None,
            last_snapshot: None,
        }
    }

    /// Seconds until the score ends, if it has an `end`.
    pub fn duration(&self) -> Option<f64> {
        self.events.iter().find(|e| e.action == Action::End).map(|e| e.at)
    }

    /// Sorts due events into key input and pending settings edits.
    fn advance(&mut self, elapsed: f64, input: &mut SurfaceInput) {
        while let Some(event) = self.events.get(self.next) {
            if event.at > elapsed {
                break;
            }
            match &event.action {
                Action::Press(key) => input.keys.push(KeyEvent::Pressed(*key)),
                Action::Release(key) => input.keys.push(KeyEvent::Released(*key)),
                Action::End => input.quit = true,
                edit => self.pending.push(edit.clone()),
            }
            self.next += 1;
        }
    }
}

impl ControlSurface for ScriptedSurface {
    fn poll(&mut self, input: &mut SurfaceInput) {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.advance(started.elapsed().as_secs_f64(), input);
    }

    fn from_ui(&mut self, settings: &mut SynthSettings, clear_dirty: bool) {
        for action in &self.pending {
            apply(settings, action);
        }
        if clear_dirty {
            self.pending.clear();
        }
    }

    fn to_ui(&mut self, snapshot: &UiSnapshot) {
        let changed = self.last_snapshot.as_ref().is_none_or(|last| {
            last.oscillator != snapshot.oscillator || last.chain.len() != snapshot.chain.len()
        });
        if changed {
            let chain: Vec<&str> = snapshot.chain.iter().map(|e| e.settings.name.as_str()).collect();
            info!(
                shape = snapshot.oscillator.builtin_shape.name(),
                chain = ?chain,
                gain = snapshot.output_gain,
                "surface"
            );
        }
        debug!(
            t = snapshot.stream_time,
            voices = snapshot.stats.engaged_voices,
            ringing = snapshot.stats.disengaged_voices,
            load = snapshot.timing.load_percent,
            "tick"
        );
        self.last_snapshot = Some(snapshot.clone());
    }
}

/// Applies one edit. Edits that do not fit the engine are logged and skipped.
fn apply(settings: &mut SynthSettings, action: &Action) {
    match action {
        Action::Shape(shape) => {
            let mut oscillator = settings.oscillator().clone();
            oscillator.source_kind = tsynth_core::SourceKind::Builtin;
            oscillator.builtin_shape = *shape;
            settings.set_oscillator(&oscillator);
        }
        Action::Sample { bank, name } => {
            let mut oscillator = settings.oscillator().clone();
            oscillator.source_kind = tsynth_core::SourceKind::SampleBased;
            oscillator.instrument_bank.clone_from(bank);
            oscillator.instrument_name.clone_from(name);
            settings.set_oscillator(&oscillator);
        }
        Action::Gain(gain) => settings.set_output_gain(*gain),
        Action::Balance(balance) => settings.set_output_balance(*balance),
        Action::Chain(names) => {
            let mut chain = settings.signal_chain().clone();
            match chain.set_chain(names.as_slice()) {
                Ok(()) => settings.set_signal_chain(&chain),
                Err(err) => debug!(error = %err, "chain edit skipped"),
            }
        }
        Action::Param { effect, index, value } => {
            let mut chain = settings.signal_chain().clone();
            let Some(position) = chain.iter().position(|e| e.name == *effect) else {
                debug!(effect = %effect, "parameter edit for an effect outside the chain");
                return;
            };
            if chain.get_mut(position).is_some_and(|entry| entry.set_value(*index, *value)) {
                settings.set_signal_chain(&chain);
            }
        }
        Action::Press(_) | Action::Release(_) | Action::End => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_parses() {
        let events = parse(DEMO).unwrap();
        assert_eq!(events.first().unwrap().action, Action::Chain(vec!["Low Pass".into()]));
        assert_eq!(ScriptedSurface::new(events).duration(), Some(3.5));
    }

    #[test]
    fn test_param_with_spaced_name() {
        let events = parse("0.5 param Moog Ladder 1 0.75").unwrap();
        assert_eq!(
            events[0].action,
            Action::Param {
                effect: "Moog Ladder".into(),
                index: 1,
                value: 0.75
            }
        );
    }

    #[test]
    fn test_bad_lines_are_reported() {
        assert!(parse("zero press a").is_err());
        assert!(parse("0.1 press ab").is_err());
        assert!(parse("0.1 shape kazoo").is_err());
        assert!(parse("0.1 dance").is_err());
    }

    #[test]
    fn test_events_are_released_on_time() {
        let events = parse("0.0 press a\n0.0 gain 0.5\n1.0 release a\n2.0 end").unwrap();
        let mut surface = ScriptedSurface::new(events);
        let mut input = SurfaceInput::default();

        surface.advance(0.5, &mut input);
        assert_eq!(input.keys, [KeyEvent::Pressed('a')]);
        assert_eq!(surface.pending, [Action::Gain(0.5)]);

        input.keys.clear();
        surface.advance(2.0, &mut input);
        assert_eq!(input.keys, [KeyEvent::Released('a')]);
        assert!(input.quit);
    }

    #[test]
    fn test_edits_apply_to_settings() {
        let mut settings = SynthSettings::new(Vec::new());
        settings.clear_dirty();
        let mut surface = ScriptedSurface::new(Vec::new());
        surface.pending = vec![Action::Shape(BuiltinShape::Sawtooth), Action::Balance(2.0)];

        surface.from_ui(&mut settings, true);
        assert!(settings.is_dirty());
        assert_eq!(settings.oscillator().builtin_shape, BuiltinShape::Sawtooth);
        assert_eq!(settings.output_balance(), 1.0);
        assert!(surface.pending.is_empty());
    }
}
