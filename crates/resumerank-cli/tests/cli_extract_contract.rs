use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One text line per page; an empty string gives a blank page.
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 11.into()]),
                    Operation::new("Td", vec![60.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            Object::from(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            }))
        })
        .collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn run(args: &[&str]) -> std::process::Output {
    let bin = assert_cmd::cargo::cargo_bin!("resumerank");
    std::process::Command::new(bin)
        .args(args)
        .env_remove("RESUMERANK_ENV_FILE")
        .output()
        .expect("run resumerank")
}

#[test]
fn extract_pdf_json_reports_pages_and_engine() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("cv.pdf");
    std::fs::write(&p, pdf_with_pages(&["Rust engineer", "", "Kafka streaming"])).unwrap();

    let out = run(&["extract", p.to_str().unwrap(), "--output", "json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse extract json");

    assert_eq!(v["kind"].as_str(), Some("extract"));
    assert_eq!(v["ok"].as_bool(), Some(true));
    let d = &v["document"];
    assert_eq!(d["label"].as_str(), Some("cv.pdf"));
    assert_eq!(d["engine"].as_str(), Some("lopdf"));
    assert_eq!(d["pages_total"].as_u64(), Some(3));
    assert_eq!(d["pages_used"].as_u64(), Some(2));
    let text = d["text"].as_str().unwrap();
    assert!(text.contains("Rust engineer"), "text={text:?}");
    assert!(text.contains("Kafka streaming"), "text={text:?}");
}

#[test]
fn generated_pdf_resumes_rank_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("backend.pdf");
    let b = dir.path().join("designer.pdf");
    let backend = pdf_with_pages(&["Senior backend engineer", "distributed systems"]);
    std::fs::write(&a, backend).unwrap();
    std::fs::write(&b, pdf_with_pages(&["Graphic designer"])).unwrap();

    let out = run(&[
        "rank",
        "--query",
        "senior backend engineer distributed systems",
        "--output",
        "json",
        b.to_str().unwrap(),
        a.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["top_candidate"]["label"].as_str(), Some("backend.pdf"));
    assert_eq!(v["results"][1]["score"].as_f64(), Some(0.0));
}

#[test]
fn extract_text_output_is_the_plain_text() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("cv.html");
    std::fs::write(
        &p,
        "<html><body><style>p{color:red}</style><p>Platform engineer</p></body></html>",
    )
    .unwrap();

    let out = run(&["extract", p.to_str().unwrap()]);
    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.contains("Platform engineer"));
    assert!(!s.contains("color"));
}
