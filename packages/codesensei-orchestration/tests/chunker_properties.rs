//! Property tests for the chunker

use codesensei_orchestration::{ChunkKind, Chunker, FileUnit};
use proptest::prelude::*;

fn source_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("export function f() {".to_string()),
        Just("class Widget {".to_string()),
        Just("const x = { a: 1 };".to_string()),
        Just("}".to_string()),
        Just("  return \"}\";".to_string()),
        Just("  // { not a brace".to_string()),
        Just("let s = `{`;".to_string()),
        Just(String::new()),
        "[a-z ;(){}]{0,20}",
    ]
}

fn source_file() -> impl Strategy<Value = (String, String)> {
    (
        prop_oneof![Just("ts"), Just("js"), Just("py"), Just("tsx")],
        prop::collection::vec(source_line(), 1..120),
    )
        .prop_map(|(ext, lines)| (format!("src/gen.{}", ext), lines.join("\n")))
}

proptest! {
    #[test]
    fn every_file_has_exactly_one_full_chunk((path, content) in source_file()) {
        let file = FileUnit::from_path(path.clone(), content);
        let chunks = Chunker::default().chunk(std::slice::from_ref(&file));

        let full: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::FullFile).collect();
        prop_assert_eq!(full.len(), 1);
        prop_assert_eq!(full[0].start_line, 1);
        prop_assert_eq!(full[0].end_line, file.line_count());
        prop_assert_eq!(&full[0].content, &file.content);
        prop_assert!(chunks.iter().all(|c| c.file_ref == path));
    }

    #[test]
    fn chunking_is_deterministic((path, content) in source_file()) {
        let file = FileUnit::from_path(path, content);
        let chunker = Chunker::default();
        prop_assert_eq!(chunker.chunk_file(&file), chunker.chunk_file(&file));
    }

    #[test]
    fn blocks_are_ordered_and_disjoint((path, content) in source_file()) {
        let file = FileUnit::from_path(path, content);
        let chunks = Chunker::default().chunk_file(&file);
        let lines: Vec<&str> = file.content.split('\n').collect();

        let mut previous_end = 0;
        for block in chunks.iter().filter(|c| c.kind == ChunkKind::Block) {
            prop_assert!(block.start_line > previous_end);
            prop_assert!(block.start_line <= block.end_line);
            prop_assert!(block.end_line <= file.line_count());
            prop_assert_eq!(&block.content, &lines[block.start_line - 1..block.end_line].join("\n"));
            previous_end = block.end_line;
        }
    }

    #[test]
    fn small_files_are_never_split(lines in prop::collection::vec(source_line(), 1..=50)) {
        let file = FileUnit::from_path("src/small.ts", lines.join("\n"));
        prop_assert_eq!(Chunker::default().chunk_file(&file).len(), 1);
    }
}
