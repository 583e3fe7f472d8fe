//! Tracks the nesting of loops, switches, and labels a statement compiles
//! inside, so `break`/`continue` (labeled or not) can resolve their target
//! without a separate scope-analysis pass over the whole function.
//!
//! Every loop/switch/label frame collects a list of branch-placeholder
//! offsets that still need a target; `break` and `continue` targets become
//! known at different points while compiling the enclosing statement (the
//! continue target as soon as the body's compiled, the break target only
//! once the whole statement is), so each gets its own pending-patch list.

use crate::bytecode::emitter::Emitter;
use crate::bytecode::page::StreamOffset;
use crate::error::{Error, ErrorKind, Result, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Loop,
    Switch,
    /// A labeled statement whose body is neither a loop nor a switch —
    /// only `break label;` can target it, never `continue label;`.
    Labeled,
}

struct Frame {
    kind: FrameKind,
    labels: Vec<String>,
    continue_patches: Vec<StreamOffset>,
    break_patches: Vec<StreamOffset>,
}

#[derive(Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
    pending_labels: Vec<String>,
}

impl FrameStack {
    pub fn new() -> Self {
        FrameStack::default()
    }

    /// Record a label attached to the statement about to be parsed.
    /// Consumed by the next `push_loop`/`push_switch`/`push_labeled` call.
    pub fn add_pending_label(&mut self, name: String, span: Span) -> Result<()> {
        if self.label_is_active(&name) {
            return Err(Error::parse(ErrorKind::DuplicateLabel, span));
        }
        self.pending_labels.push(name);
        Ok(())
    }

    pub fn has_pending_labels(&self) -> bool {
        !self.pending_labels.is_empty()
    }

    fn label_is_active(&self, name: &str) -> bool {
        self.pending_labels.iter().any(|l| l == name) || self.frames.iter().any(|f| f.labels.iter().any(|l| l == name))
    }

    fn take_pending_labels(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_labels)
    }

    pub fn push_loop(&mut self) {
        let labels = self.take_pending_labels();
        self.frames.push(Frame { kind: FrameKind::Loop, labels, continue_patches: Vec::new(), break_patches: Vec::new() });
    }

    pub fn push_switch(&mut self) {
        let labels = self.take_pending_labels();
        self.frames.push(Frame { kind: FrameKind::Switch, labels, continue_patches: Vec::new(), break_patches: Vec::new() });
    }

    pub fn push_labeled(&mut self) {
        let labels = self.take_pending_labels();
        self.frames.push(Frame { kind: FrameKind::Labeled, labels, continue_patches: Vec::new(), break_patches: Vec::new() });
    }

    /// Patch every pending `continue` in the current (innermost) frame to
    /// `target`, called once the loop knows where its re-check/update
    /// clause begins.
    pub fn resolve_continue_patches(&mut self, target: StreamOffset, emitter: &mut Emitter) {
        let frame = self.frames.last_mut().expect("resolve_continue_patches without an open frame");
        for offset in frame.continue_patches.drain(..) {
            emitter.patch_branch_placeholder(offset, target);
        }
    }

    /// Pop the current frame, patching every pending `break` to `target`
    /// (the statement's end).
    pub fn pop(&mut self, target: StreamOffset, emitter: &mut Emitter) {
        let frame = self.frames.pop().expect("pop without a matching push");
        for offset in frame.break_patches {
            emitter.patch_branch_placeholder(offset, target);
        }
    }

    pub fn record_break(&mut self, label: Option<&str>, offset: StreamOffset, span: Span) -> Result<()> {
        match label {
            None => {
                for frame in self.frames.iter_mut().rev() {
                    if matches!(frame.kind, FrameKind::Loop | FrameKind::Switch) {
                        frame.break_patches.push(offset);
                        return Ok(());
                    }
                }
                Err(Error::parse(ErrorKind::BreakNotInLoopOrSwitch, span))
            }
            Some(name) => {
                for frame in self.frames.iter_mut().rev() {
                    if frame.labels.iter().any(|l| l == name) {
                        frame.break_patches.push(offset);
                        return Ok(());
                    }
                }
                Err(Error::parse(ErrorKind::TargetLabelNotFound, span))
            }
        }
    }

    pub fn record_continue(&mut self, label: Option<&str>, offset: StreamOffset, span: Span) -> Result<()> {
        match label {
            None => {
                for frame in self.frames.iter_mut().rev() {
                    if frame.kind == FrameKind::Loop {
                        frame.continue_patches.push(offset);
                        return Ok(());
                    }
                }
                Err(Error::parse(ErrorKind::ContinueNotInLoop, span))
            }
            Some(name) => {
                for frame in self.frames.iter_mut().rev() {
                    if frame.labels.iter().any(|l| l == name) {
                        if frame.kind != FrameKind::Loop {
                            return Err(Error::parse(ErrorKind::ContinueNotInLoop, span));
                        }
                        frame.continue_patches.push(offset);
                        return Ok(());
                    }
                }
                Err(Error::parse(ErrorKind::TargetLabelNotFound, span))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_outside_loop_is_rejected() {
        let mut stack = FrameStack::new();
        let err = stack.record_break(None, 0, Span::default()).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BreakNotInLoopOrSwitch));
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut stack = FrameStack::new();
        stack.add_pending_label("outer".to_string(), Span::default()).unwrap();
        stack.push_loop();
        let err = stack.add_pending_label("outer".to_string(), Span::default()).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::DuplicateLabel));
    }

    #[test]
    fn labeled_continue_targets_the_named_loop() {
        let mut stack = FrameStack::new();
        stack.add_pending_label("outer".to_string(), Span::default()).unwrap();
        stack.push_loop();
        stack.push_loop();
        stack.record_continue(Some("outer"), 10, Span::default()).unwrap();
        let err = stack.record_continue(Some("missing"), 10, Span::default()).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::TargetLabelNotFound));
    }
}
