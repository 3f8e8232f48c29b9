//! Stack capture and rendering, exercised through real call chains.

use std::hint::black_box;

use rotolog::stack::{self, Depth};

#[inline(never)]
fn gamma() -> String {
    stack::render(0)
}

#[inline(never)]
fn beta() -> String {
    black_box(gamma())
}

#[inline(never)]
fn alpha() -> String {
    black_box(beta())
}

#[test]
fn frames_run_innermost_to_outermost() {
    let rendered = alpha();
    let gamma_at = rendered.find("gamma").unwrap();
    let beta_at = rendered.find("beta").unwrap();
    let alpha_at = rendered.find("alpha").unwrap();
    assert!(gamma_at < beta_at, "gamma must precede beta:\n{rendered}");
    assert!(beta_at < alpha_at, "beta must precede alpha:\n{rendered}");
}

#[test]
fn skip_drops_innermost_frames() {
    #[inline(never)]
    fn skip_victim() -> String {
        stack::render(1)
    }

    #[inline(never)]
    fn skip_survivor() -> String {
        black_box(skip_victim())
    }

    let rendered = black_box(skip_survivor());
    assert!(!rendered.contains("skip_victim"), "skipped frame leaked:\n{rendered}");
    assert!(rendered.contains("skip_survivor"));
}

#[test]
fn first_depth_yields_exactly_the_caller() {
    #[inline(never)]
    fn probe() -> Vec<String> {
        let stack = stack::capture(0, Depth::First);
        assert!(stack.address_count() <= 16, "first-frame capture walked too far");
        stack.map(|frame| frame.function().to_string()).collect()
    }

    let frames = black_box(probe());
    assert_eq!(frames.len(), 1);
    assert!(frames[0].contains("probe"), "unexpected frame: {}", frames[0]);
}

#[inline(never)]
fn recurse(depth: usize) -> (usize, usize) {
    if depth == 0 {
        let stack = stack::capture(0, Depth::Full);
        let addresses = stack.address_count();
        let own = stack
            .filter(|frame| frame.function().contains("recurse"))
            .count();
        (addresses, own)
    } else {
        black_box(recurse(depth - 1))
    }
}

#[test]
fn deep_stacks_grow_past_the_default_buffer() {
    let (addresses, own) = recurse(70);
    assert!(addresses > 64, "capture stopped short at {addresses} addresses");
    assert_eq!(own, 71, "every recursion level must be present");
}

#[test]
fn bootstrap_frames_stay_out_of_renders() {
    let rendered = alpha();
    assert!(!rendered.contains("lang_start"), "{rendered}");
    assert!(!rendered.contains("__libc_start_main"), "{rendered}");
    assert!(!rendered.contains("start_thread"), "{rendered}");
    assert!(!rendered.contains("short_backtrace"), "{rendered}");
}

#[test]
fn rendered_frames_pair_function_and_location_lines() {
    let rendered = alpha();
    assert!(!rendered.is_empty());
    assert!(!rendered.ends_with('\n'));

    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len() % 2, 0, "dangling half frame:\n{rendered}");
    for pair in lines.chunks(2) {
        assert!(!pair[0].starts_with('\t'), "function line indented: {}", pair[0]);
        assert!(pair[1].starts_with('\t'), "location line unindented: {}", pair[1]);
        let location = pair[1].trim_start_matches('\t');
        let (_, line_no) = location.rsplit_once(':').unwrap();
        line_no.parse::<u32>().unwrap();
    }
}

#[test]
fn symbol_hashes_are_stripped() {
    let rendered = alpha();
    for line in rendered.lines().step_by(2) {
        if let Some(at) = line.rfind("::h") {
            let tail = &line[at + 3..];
            let looks_hashed = tail.len() == 16 && tail.bytes().all(|b| b.is_ascii_hexdigit());
            assert!(!looks_hashed, "unstripped symbol hash in {line}");
        }
    }
}

#[test]
fn the_innermost_frame_locates_this_file() {
    #[inline(never)]
    fn here() -> Option<(String, u32)> {
        stack::capture(0, Depth::Full)
            .next()
            .map(|frame| (frame.file().to_string(), frame.line()))
    }

    let (file, line) = black_box(here()).unwrap();
    assert!(file.ends_with("stack_capture.rs"), "unexpected file: {file}");
    assert!(line > 0);
}
