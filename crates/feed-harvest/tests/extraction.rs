// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

mod support;

use feed_harvest::extraction::{ExtractionPipeline, NormalizedPost};
use support::*;

fn pipeline() -> ExtractionPipeline {
    let config = test_config();
    ExtractionPipeline::new(&config.extraction, &config.overlay).unwrap()
}

async fn extract_all(session: &FakeSession) -> feed_harvest::extraction::Extraction {
    let items = feed_harvest::session::BrowserSession::find_all(session, ITEM)
        .await
        .unwrap();
    pipeline().extract(session, &items).await
}

#[tokio::test]
async fn test_detail_lines_fill_missing_header() {
    let item = FakeNode::new()
        .child(DETAILS, FakeNode::new().text("By Jane Doe"))
        .child(DETAILS, FakeNode::new().text("2024-01-01 10:00"))
        .child(DESCRIPTION, FakeNode::new().text("  Homework is due Friday.  "));
    let session = FakeSession::new().with_feed(vec![item], 1, &[]);

    let extraction = extract_all(&session).await;

    assert_eq!(
        extraction.posts,
        vec![NormalizedPost {
            teacher: "Jane Doe".into(),
            datetime: "2024-01-01 10:00".into(),
            content: "Homework is due Friday.".into(),
            attachments: vec![],
        }]
    );
}

#[tokio::test]
async fn test_empty_header_text_falls_back_per_field() {
    let item = FakeNode::new()
        .child(HEADER_AUTHOR, FakeNode::new().text("   "))
        .child(HEADER_TIME, FakeNode::new().text("Yesterday 14:05"))
        .child(DETAILS, FakeNode::new().text("by Mr. Rao"))
        .child(DETAILS, FakeNode::new().text("2024-03-02 14:05"));
    let session = FakeSession::new().with_feed(vec![item], 1, &[]);

    let post = &extract_all(&session).await.posts[0];

    assert_eq!(post.teacher, "Mr. Rao");
    // the header timestamp was present, so it wins
    assert_eq!(post.datetime, "Yesterday 14:05");
}

#[tokio::test]
async fn test_missing_fields_stay_empty() {
    let item = FakeNode::new().child(DETAILS, FakeNode::new().text("By Ms. Iyer"));
    let session = FakeSession::new().with_feed(vec![item], 1, &[]);

    let post = &extract_all(&session).await.posts[0];

    assert_eq!(post.teacher, "Ms. Iyer");
    assert_eq!(post.datetime, "");
    assert_eq!(post.content, "");
}

#[tokio::test]
async fn test_footer_markup_preferred_over_description() {
    let item = post("A", "B", "  <b>Exam</b> moved<br>to Monday ")
        .child(DESCRIPTION, FakeNode::new().text("plain description"));
    let session = FakeSession::new().with_feed(vec![item], 1, &[]);

    let post = &extract_all(&session).await.posts[0];

    assert_eq!(post.content, "<b>Exam</b> moved<br>to Monday");
}

#[tokio::test]
async fn test_empty_footer_does_not_fall_back_to_description() {
    let item = post("A", "B", "   ")
        .child(DESCRIPTION, FakeNode::new().text("Tap the card below"));
    let session = FakeSession::new().with_feed(vec![item], 1, &[]);

    let post = &extract_all(&session).await.posts[0];

    assert_eq!(post.content, "");
}

#[tokio::test]
async fn test_description_used_when_footer_absent() {
    let item = FakeNode::new()
        .child(HEADER_AUTHOR, FakeNode::new().text("A"))
        .child(DESCRIPTION, FakeNode::new().text(" Tap the card below "));
    let session = FakeSession::new().with_feed(vec![item], 1, &[]);

    let post = &extract_all(&session).await.posts[0];

    assert_eq!(post.content, "Tap the card below");
}

#[tokio::test]
async fn test_resource_posts_are_excluded_in_order() {
    let mut items = Vec::new();
    for i in 0..12 {
        items.push(match i {
            3 => resource("Resource"),
            8 => resource("  RESOURCE \n"),
            _ => post(&format!("Teacher {i}"), &format!("2024-02-{:02} 08:00", i + 1), "hi"),
        });
    }
    let session = FakeSession::new().with_feed(items, 12, &[]);

    let extraction = extract_all(&session).await;

    assert_eq!(extraction.posts.len(), 10);
    assert_eq!(extraction.skipped, 2);
    let teachers: Vec<&str> = extraction.posts.iter().map(|p| p.teacher.as_str()).collect();
    assert_eq!(
        teachers,
        vec![
            "Teacher 0", "Teacher 1", "Teacher 2", "Teacher 4", "Teacher 5", "Teacher 6",
            "Teacher 7", "Teacher 9", "Teacher 10", "Teacher 11",
        ]
    );
    assert!(extraction.posts.iter().all(|p| p.teacher != "Librarian"));
}

#[tokio::test]
async fn test_other_categories_are_kept() {
    let items = vec![resource("Resources"), resource("Assignment")];
    let session = FakeSession::new().with_feed(items, 2, &[]);

    let extraction = extract_all(&session).await;

    assert_eq!(extraction.posts.len(), 2);
    assert_eq!(extraction.skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_attachments_keep_card_order() {
    let item = post("A", "B", "")
        .child(CARD, inline_video_card("https://cdn.test/1.mp4"))
        .child(CARD, preview_card("https://cdn.test/2.pdf"))
        .child(CARD, inline_video_card("https://cdn.test/3.mp4"))
        .child(CARD, preview_card("https://cdn.test/4.png"));
    let session = FakeSession::new().with_feed(vec![item], 1, &[]);

    let extraction = extract_all(&session).await;

    assert_eq!(
        extraction.posts[0].attachments,
        vec![
            "https://cdn.test/1.mp4",
            "https://cdn.test/2.pdf",
            "https://cdn.test/3.mp4",
            "https://cdn.test/4.png",
        ]
    );
    assert_eq!(extraction.attachments_missed, 0);
    assert_eq!(session.activations(), 2);
}
