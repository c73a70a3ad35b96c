// End-to-end pipeline tests over a temp manuscript tree
// WHY: Exercise discovery -> read -> detect -> mention file -> stats together

use dramatis::discovery;
use dramatis::pipeline::{process_files_parallel, PipelineConfig};
use dramatis::stats::TallyBuilder;
use dramatis::{incremental, MentionDetector, NameRoster};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

async fn write_chapter(root: &Path, name: &str, content: &str) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    tokio::fs::write(&path, content).await.unwrap();
    path
}

#[tokio::test]
async fn test_full_pipeline_over_manuscript_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let ch1 = write_chapter(root, "chapter-01.txt", "张三和李四一起出发。\n张三走在前面。").await;
    let ch2 = write_chapter(root, "part2/chapter-02.txt", "李四独自回到了村里。").await;
    let ch3 = write_chapter(root, "chapter-03.txt", "这一章没有人物出场。").await;

    let roster = NameRoster::from_lines("# cast\n张三\n李四\n王五\n");
    let detector = Arc::new(MentionDetector::new(roster));

    let mut files = discovery::find_chapter_files(root).await.unwrap();
    files.sort();
    assert_eq!(files.len(), 3);

    let outcomes =
        process_files_parallel(&files, detector, &PipelineConfig::default(), None).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.succeeded()));

    // Every chapter gets a mention file, even the one without mentions
    assert!(incremental::mentions_file_exists(&ch1));
    assert!(incremental::mentions_file_exists(&ch2));
    assert!(incremental::mentions_file_exists(&ch3));

    let ch1_mentions = incremental::read_mentions_file(&ch1).unwrap();
    assert_eq!(
        ch1_mentions,
        "0\t张三\t(0,2)\n1\t李四\t(3,5)\n2\t张三\t(11,13)\n"
    );

    let ch2_mentions = incremental::read_mentions_file_async(&ch2).await.unwrap();
    assert_eq!(ch2_mentions, "0\t李四\t(0,2)\n");

    let ch3_mentions = incremental::read_mentions_file(&ch3).unwrap();
    assert_eq!(ch3_mentions, "");
}

#[tokio::test]
async fn test_appearance_tally_across_chapters() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let ch1 = write_chapter(root, "chapter-01.txt", "张三、张三、李四。").await;
    let ch2 = write_chapter(root, "chapter-02.txt", "李四、李四、李四。").await;

    let detector = Arc::new(MentionDetector::new(NameRoster::new(["张三", "李四"])));
    let outcomes = process_files_parallel(
        &[ch1, ch2],
        detector,
        &PipelineConfig::default(),
        None,
    )
    .await
    .unwrap();

    let mut tally = TallyBuilder::new();
    for outcome in &outcomes {
        let title = outcome.path.file_stem().unwrap().to_str().unwrap();
        tally.record_chapter(title, outcome.counts.iter().map(|(n, c)| (n.as_str(), *c)));
    }
    let tallies = tally.finish();

    assert_eq!(tallies.len(), 2);
    assert_eq!(tallies[0].name, "李四");
    assert_eq!(tallies[0].total, 4);
    assert_eq!(tallies[1].name, "张三");
    assert_eq!(tallies[1].total, 2);

    // 张三 never appears in chapter-02, so that chapter is absent from its tally
    assert_eq!(tallies[1].chapters.len(), 1);
    assert_eq!(tallies[1].chapters[0].title, "chapter-01");
}

#[tokio::test]
async fn test_mmap_and_buffered_produce_identical_output() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let chapter = write_chapter(root, "chapter-01.txt", "王五在桥头等张三。\n张三没有来。").await;
    let detector = Arc::new(MentionDetector::new(NameRoster::new(["张三", "王五"])));

    let buffered_config = PipelineConfig::default();
    process_files_parallel(&[chapter.clone()], Arc::clone(&detector), &buffered_config, None)
        .await
        .unwrap();
    let buffered_output = incremental::read_mentions_file(&chapter).unwrap();

    let mmap_config = PipelineConfig { use_mmap: true, ..Default::default() };
    process_files_parallel(&[chapter.clone()], detector, &mmap_config, None).await.unwrap();
    let mmap_output = incremental::read_mentions_file(&chapter).unwrap();

    assert_eq!(buffered_output, mmap_output);
    assert!(!buffered_output.is_empty());
}
