//! Driving the engine with custom edit handlers.
#![allow(clippy::unwrap_used)]

use eastconst::engine::{EastConstEngine, EditHandler, EngineConfig};
use eastconst::fix::RewriteError;
use eastconst::frontend::matcher::{register_east_const_matchers, MatchFinder};
use eastconst::frontend::parse;
use eastconst::frontend::source::{ByteRange, SourceFile};

#[derive(Default)]
struct Recorder {
    edits: Vec<(ByteRange, String)>,
}

impl EditHandler for Recorder {
    fn handle(
        &mut self,
        _source: &SourceFile,
        range: ByteRange,
        text: &str,
    ) -> Result<(), RewriteError> {
        self.edits.push((range, text.to_owned()));
        Ok(())
    }
}

struct RejectAll;

impl EditHandler for RejectAll {
    fn handle(
        &mut self,
        _source: &SourceFile,
        _range: ByteRange,
        _text: &str,
    ) -> Result<(), RewriteError> {
        Err(RewriteError::OverlappingEdits {
            edit_a: 0,
            edit_b: 1,
        })
    }
}

fn drive(text: &str, handler: &mut dyn EditHandler) -> usize {
    let source = SourceFile::from_text("handler.cpp", text).unwrap();
    let tu = parse(&source);
    let mut finder = MatchFinder::new();
    register_east_const_matchers(&mut finder);
    let mut engine = EastConstEngine::new(EngineConfig { quiet: true }, handler);
    finder.match_translation_unit(&source, &tu, &mut engine);
    engine.into_findings().len()
}

#[test]
fn test_removal_then_insertion() {
    let mut recorder = Recorder::default();
    let findings = drive("const int x;\n", &mut recorder);
    assert_eq!(findings, 1);
    assert_eq!(
        recorder.edits,
        vec![
            (ByteRange::new(0, 6), String::new()),
            (ByteRange::empty(9), " const".to_owned()),
        ]
    );
}

#[test]
fn test_comment_splits_removals() {
    let mut recorder = Recorder::default();
    drive("const /* c */ volatile int x;\n", &mut recorder);
    assert_eq!(
        recorder.edits,
        vec![
            (ByteRange::new(0, 6), String::new()),
            (ByteRange::new(14, 23), String::new()),
            (ByteRange::empty(26), " const volatile".to_owned()),
        ]
    );
}

#[test]
fn test_rejected_edits_are_not_findings() {
    let findings = drive("const int x;\nconst char* p;\n", &mut RejectAll);
    assert_eq!(findings, 0);
}

#[test]
fn test_nothing_to_move() {
    let mut recorder = Recorder::default();
    assert_eq!(drive("int const x;\nchar* const p = 0;\n", &mut recorder), 0);
    assert!(recorder.edits.is_empty());
}
