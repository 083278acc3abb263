//! Batch-level tests: several documents rendered against one shared chain.
//!
//! These drive `run_batch` end to end with scripted executors and in-memory
//! chains to check failure handling and snapshot isolation between documents.

use std::path::Path;

use litdoc::batch::run_batch;
use litdoc::io::chain::NoopChain;
use litdoc::io::executor::DisabledExecutor;
use litdoc::render::render_document;
use litdoc::test_support::{
    ChainEvent, DocTree, RecordingChain, ScriptedExecutor, ScriptedRun, ToyChain, ToyExecutor,
    test_settings,
};

fn patterns(items: &[&str]) -> Vec<String> {
    items.iter().map(|p| p.to_string()).collect()
}

#[test]
fn failing_document_does_not_stop_the_batch() {
    let tree = DocTree::new().expect("tree");
    for name in ["docs/1.ts", "docs/2.ts", "docs/3.ts"] {
        tree.write(name, "run();\n").expect("write");
    }
    let settings = test_settings(tree.path());
    let executor = ScriptedExecutor::new(vec![
        ScriptedRun::outputs(&["one"]),
        ScriptedRun::Fail("exit status 1".into()),
        ScriptedRun::outputs(&["three"]),
    ]);
    let chain = RecordingChain::default();

    let summary = run_batch(&settings, &patterns(&["docs/*.ts"]), &executor, &chain).expect("batch");

    assert_eq!(summary.report_line(), "rendered 2/3 files");
    assert!(summary.aborted.is_none());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].path, Path::new("docs/2.ts"));
    assert!(tree.read("out/docs/1.ts.md").expect("first").contains("one"));
    assert!(tree.read("out/docs/3.ts.md").expect("third").contains("three"));
    assert!(!tree.path().join("out/docs/2.ts.md").exists());

    // The failed document was still reverted.
    let reverts = chain
        .events()
        .into_iter()
        .filter(|e| matches!(e, ChainEvent::Revert(_)))
        .count();
    assert_eq!(reverts, 3);
}

/// Document A mutates the chain; document B only reads it. B must render
/// exactly as it would had A never run.
#[test]
fn documents_do_not_observe_each_others_state() {
    let a = "/* === Send some funds. === */\ntransfer 40\nprint balance\n";
    let b = "/* === Check the balance. === */\nprint balance\n";

    let batch_tree = DocTree::new().expect("tree");
    batch_tree.write("docs/a.ts", a).expect("write a");
    batch_tree.write("docs/b.ts", b).expect("write b");
    let chain = ToyChain::with_balance(100);
    let executor = ToyExecutor::new(&chain);

    let summary = run_batch(
        &test_settings(batch_tree.path()),
        &patterns(&["docs/a.ts", "docs/b.ts"]),
        &executor,
        &chain,
    )
    .expect("batch");
    assert_eq!(summary.processed, 2);
    assert_eq!(chain.balance(), 100);
    assert!(batch_tree.read("out/docs/a.ts.md").expect("a").contains("balance: 60"));

    let alone_tree = DocTree::new().expect("tree");
    alone_tree.write("docs/b.ts", b).expect("write b");
    let alone_chain = ToyChain::with_balance(100);
    let alone = render_document(
        &test_settings(alone_tree.path()),
        &ToyExecutor::new(&alone_chain),
        Path::new("docs/b.ts"),
    )
    .expect("render alone");

    let in_batch = batch_tree.read("out/docs/b.ts.md").expect("b");
    assert_eq!(in_batch, alone.markdown);
    assert!(in_batch.contains("balance: 100"));
}

#[test]
fn crashing_document_leaves_no_state_behind() {
    let tree = DocTree::new().expect("tree");
    tree.write("docs/1.ts", "transfer 30\ncrash\n").expect("write");
    tree.write("docs/2.ts", "print balance\n").expect("write");
    let chain = ToyChain::with_balance(50);
    let executor = ToyExecutor::new(&chain);

    let summary = run_batch(
        &test_settings(tree.path()),
        &patterns(&["docs/*.ts"]),
        &executor,
        &chain,
    )
    .expect("batch");

    assert_eq!(summary.report_line(), "rendered 1/2 files");
    assert!(tree.read("out/docs/2.ts.md").expect("second").contains("balance: 50"));
}

#[test]
fn failed_revert_aborts_remaining_documents() {
    let tree = DocTree::new().expect("tree");
    for name in ["docs/1.ts", "docs/2.ts", "docs/3.ts"] {
        tree.write(name, "run();\n").expect("write");
    }
    let executor = ScriptedExecutor::new(vec![
        ScriptedRun::outputs(&["one"]),
        ScriptedRun::outputs(&["two"]),
        ScriptedRun::outputs(&["three"]),
    ]);
    let chain = RecordingChain {
        fail_revert: true,
        ..RecordingChain::default()
    };

    let summary = run_batch(
        &test_settings(tree.path()),
        &patterns(&["docs/*.ts"]),
        &executor,
        &chain,
    )
    .expect("batch");

    let reason = summary.aborted.as_deref().expect("aborted");
    assert!(reason.contains("docs/1.ts"));
    assert_eq!(summary.report_line(), "rendered 1/3 files");
    assert_eq!(executor.seen_units().len(), 1);
    assert_eq!(
        chain.events(),
        vec![
            ChainEvent::Snapshot("0x1".into()),
            ChainEvent::Revert("0x1".into()),
        ]
    );
}

#[test]
fn disabled_execution_renders_identically_twice() {
    let tree = DocTree::new().expect("tree");
    tree.write(
        "docs/intro.ts",
        "/* ===\n# Intro\n\nSee [setup](./setup.ts#accounts).\n=== */\nconsole.log(Date.now());\n",
    )
    .expect("write intro");
    tree.write("docs/setup.ts", "//// {\"include\": \"./common/c.ts\"}\nsetup();\n")
        .expect("write setup");
    tree.write("docs/common/c.ts", "import { x } from './x';\n")
        .expect("write common");
    let settings = test_settings(tree.path());
    let docs = patterns(&["docs/*.ts"]);

    run_batch(&settings, &docs, &DisabledExecutor, &NoopChain).expect("first batch");
    let first_intro = tree.read("out/docs/intro.ts.md").expect("intro");
    let first_setup = tree.read("out/docs/setup.ts.md").expect("setup");

    run_batch(&settings, &docs, &DisabledExecutor, &NoopChain).expect("second batch");
    assert_eq!(tree.read("out/docs/intro.ts.md").expect("intro"), first_intro);
    assert_eq!(tree.read("out/docs/setup.ts.md").expect("setup"), first_setup);

    assert!(first_intro.contains("[setup](./setup.ts.md#accounts)"));
    assert!(!first_intro.contains("Output:"));
    assert!(first_setup.contains("import { x } from './common/x';"));
}
