//! Subcommands. Parsing and execution are pure; `main` does the I/O.

use chrono::NaiveDateTime;
use iiif_core::annotation::AnnotationView;
use iiif_core::export::{annotations_export_name, manifest_export_name, to_pretty_json};
use iiif_core::{AnnotationSource, Manifest, ViewerError};
use std::fmt::Write;
use std::path::PathBuf;

pub const USAGE: &str = "\
usage: iiif-tool <command> <manifest.json> [options]

commands:
  normalize     print the manifest normalized to Presentation 2
  languages     list label languages in first-seen order
  annotations   list a canvas's annotations (--canvas N, --lang L)
  export-name   print export file names (--canvas N, --lang L, --at YYYY-MM-DDTHH:MM)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Normalize {
        path: PathBuf,
    },
    Languages {
        path: PathBuf,
    },
    Annotations {
        path: PathBuf,
        canvas: usize,
        lang: Option<String>,
    },
    ExportName {
        path: PathBuf,
        canvas: usize,
        lang: Option<String>,
        at: Option<NaiveDateTime>,
    },
}

impl Command {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Normalize { path }
            | Self::Languages { path }
            | Self::Annotations { path, .. }
            | Self::ExportName { path, .. } => path,
        }
    }
}

/// Parse `argv[1..]`. Errors are usage messages.
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let (name, rest) = args.split_first().ok_or("missing command")?;
    let (path, options) = rest
        .split_first()
        .ok_or_else(|| format!("`{name}` needs a manifest path"))?;
    let path = PathBuf::from(path);

    let mut canvas = 0;
    let mut lang = None;
    let mut at = None;
    let mut it = options.iter();
    while let Some(flag) = it.next() {
        let value = it
            .next()
            .ok_or_else(|| format!("`{flag}` needs a value"))?;
        match flag.as_str() {
            "--canvas" => {
                canvas = value
                    .parse()
                    .map_err(|_| format!("bad canvas index `{value}`"))?;
            }
            "--lang" => lang = Some(value.clone()),
            "--at" => {
                at = Some(
                    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
                        .map_err(|e| format!("bad timestamp `{value}`: {e}"))?,
                );
            }
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    match name.as_str() {
        "normalize" => Ok(Command::Normalize { path }),
        "languages" => Ok(Command::Languages { path }),
        "annotations" => Ok(Command::Annotations { path, canvas, lang }),
        "export-name" => Ok(Command::ExportName {
            path,
            canvas,
            lang,
            at,
        }),
        other => Err(format!("unknown command `{other}`")),
    }
}

/// Run a command over the manifest text. `now` stands in for a missing
/// `--at`.
pub fn execute(command: &Command, text: &str, now: NaiveDateTime) -> iiif_core::Result<String> {
    let manifest = Manifest::from_json(text)?;
    log::debug!(
        "read {} manifest {}",
        manifest.source_version().as_str(),
        manifest.id()
    );
    match command {
        Command::Normalize { .. } => to_pretty_json(manifest.as_value()),
        Command::Languages { .. } => Ok(manifest.languages().join("\n")),
        Command::Annotations { canvas, lang, .. } => {
            list_annotations(&manifest, *canvas, lang.as_deref())
        }
        Command::ExportName {
            canvas, lang, at, ..
        } => {
            let lang = lang.as_deref();
            let at = at.unwrap_or(now);
            let canvas = manifest
                .canvas(*canvas)
                .ok_or_else(|| out_of_range(*canvas, &manifest))?;
            Ok(format!(
                "{}\n{}",
                manifest_export_name(&manifest.label(lang), at.date()),
                annotations_export_name(manifest.id(), &canvas.label(lang), at)
            ))
        }
    }
}

fn list_annotations(manifest: &Manifest, index: usize, lang: Option<&str>) -> iiif_core::Result<String> {
    let canvas = manifest
        .canvas(index)
        .ok_or_else(|| out_of_range(index, manifest))?;
    let mut out = format!("# {} ({})\n", canvas.label(lang), canvas.id());
    match canvas.annotation_source() {
        AnnotationSource::Inline(resources) => {
            for raw in &resources {
                let view = AnnotationView::parse(raw, false);
                let _ = writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    view.id.map(|id| id.as_str().to_string()).unwrap_or_else(|| "-".into()),
                    view.primary_motivation(),
                    view.region.to_fragment(),
                    view.chars.replace(['\n', '\t'], " ")
                );
            }
        }
        AnnotationSource::Remote(url) => {
            let _ = writeln!(out, "remote list: {url}");
        }
        AnnotationSource::None => out.push_str("no annotations\n"),
    }
    Ok(out.trim_end().to_string())
}

fn out_of_range(index: usize, manifest: &Manifest) -> ViewerError {
    ViewerError::Validation(format!(
        "canvas {index} out of range ({} canvases)",
        manifest.canvas_count()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const PSALTER: &str = r#"{
        "@context": "http://iiif.io/api/presentation/2/context.json",
        "@id": "https://iiif.example.org/psalter/manifest.json",
        "@type": "sc:Manifest",
        "label": [
            {"@language": "en", "@value": "Psalter fragment"},
            {"@language": "la", "@value": "Psalterium"}
        ],
        "sequences": [{
            "canvases": [
                {
                    "@id": "https://iiif.example.org/psalter/canvas/1",
                    "label": "f. 1r",
                    "width": 1200,
                    "height": 1600,
                    "otherContent": [{
                        "@id": "https://iiif.example.org/psalter/list/1",
                        "resources": [{
                            "@id": "a1",
                            "motivation": "oa:tagging",
                            "resource": {"chars": "Initial\nB"},
                            "on": "https://iiif.example.org/psalter/canvas/1#xywh=10,20,30,40"
                        }]
                    }]
                },
                {
                    "@id": "https://iiif.example.org/psalter/canvas/2",
                    "label": "f. 1v",
                    "otherContent": ["https://iiif.example.org/psalter/list/2"]
                }
            ]
        }]
    }"#;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn parses_options_in_any_order() {
        let cmd = parse_args(&args(&["annotations", "m.json", "--lang", "la", "--canvas", "1"])).unwrap();
        assert_eq!(
            cmd,
            Command::Annotations {
                path: PathBuf::from("m.json"),
                canvas: 1,
                lang: Some("la".into()),
            }
        );
    }

    #[test]
    fn rejects_unknown_command_and_dangling_flag() {
        assert!(parse_args(&args(&["frobnicate", "m.json"])).is_err());
        assert!(parse_args(&args(&["languages"])).is_err());
        assert!(parse_args(&args(&["annotations", "m.json", "--canvas"])).is_err());
        assert!(parse_args(&args(&["export-name", "m.json", "--at", "yesterday"])).is_err());
    }

    #[test]
    fn languages_in_declared_order() {
        let cmd = parse_args(&args(&["languages", "m.json"])).unwrap();
        assert_eq!(execute(&cmd, PSALTER, noon()).unwrap(), "en\nla");
    }

    #[test]
    fn inline_annotations_are_listed() {
        let cmd = parse_args(&args(&["annotations", "m.json"])).unwrap();
        assert_eq!(
            execute(&cmd, PSALTER, noon()).unwrap(),
            "# f. 1r (https://iiif.example.org/psalter/canvas/1)\n\
             a1\ttagging\txywh=10,20,30,40\tInitial B"
        );
    }

    #[test]
    fn remote_list_is_reported() {
        let cmd = parse_args(&args(&["annotations", "m.json", "--canvas", "1"])).unwrap();
        let out = execute(&cmd, PSALTER, noon()).unwrap();
        assert!(out.ends_with("remote list: https://iiif.example.org/psalter/list/2"));
    }

    #[test]
    fn export_names_use_label_language_and_timestamp() {
        let cmd = parse_args(&args(&["export-name", "m.json", "--lang", "la", "--at", "2024-03-09T14:05"])).unwrap();
        assert_eq!(
            execute(&cmd, PSALTER, noon()).unwrap(),
            "Psalterium_20240309.json\npsalter_f_1r_annotations_202403091405.json"
        );
    }

    #[test]
    fn canvas_out_of_range_is_a_validation_error() {
        let cmd = parse_args(&args(&["annotations", "m.json", "--canvas", "7"])).unwrap();
        assert!(matches!(
            execute(&cmd, PSALTER, noon()),
            Err(ViewerError::Validation(_))
        ));
    }

    #[test]
    fn unrecognized_manifest_is_rejected() {
        let cmd = parse_args(&args(&["normalize", "m.json"])).unwrap();
        assert!(matches!(
            execute(&cmd, r#"{"label": "no context"}"#, noon()),
            Err(ViewerError::InvalidManifest(_))
        ));
    }
}
