//! Notes file -> model file -> generated note, the way the CLI chains them.

use notegrab_markov::{MarkovData, Simulator, Trainer, load_note_texts};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

#[test]
fn notes_file_to_generated_note() {
    let tmp = TempDir::new().unwrap();
    let notes = tmp.path().join("all_notes.json");
    let model = tmp.path().join("markov_data.json");
    std::fs::write(
        &notes,
        r#"[
            {"id": "a", "text": "$[x2 :blobcat:] おはよう", "cw": null},
            {"id": "b", "text": null, "renoteId": "zz"}
        ]"#,
    )
    .unwrap();

    let mut trainer = Trainer::new().unwrap();
    for text in load_note_texts(&notes).unwrap() {
        trainer.feed(&text).unwrap();
    }
    assert_eq!(trainer.notes_seen(), 1);
    trainer.finish().save(&model).unwrap();

    let sim = Simulator::new(MarkovData::load(&model).unwrap());
    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(sim.generate(10, &mut rng), "$[x2 :blobcat:] おはよう");
}
