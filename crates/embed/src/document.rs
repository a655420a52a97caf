//! Static player document generation.
//!
//! The document is self-contained apart from the external player API it
//! loads at runtime. Browsers refuse that API on `file://` pages, so the
//! output has to be served over HTTP; the page shows a notice when it is
//! opened as a local file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use powerhour_common::config::EmbedDefaults;
use powerhour_common::error::{PowerHourError, PowerHourResult};
use powerhour_playlist_model::{ItemSource, SelectionPlan};

const TEMPLATE: &str = include_str!("../assets/player.html");

/// Parameters of one generated document.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedOptions {
    pub clip_seconds: f64,
    pub pre_chorus: f64,
    pub default_start: f64,
    pub title_reveal_delay: f64,
    pub page_title: String,
}

impl EmbedOptions {
    pub fn from_defaults(defaults: &EmbedDefaults) -> Self {
        Self {
            clip_seconds: defaults.clip_seconds,
            pre_chorus: defaults.pre_chorus,
            default_start: defaults.default_start,
            title_reveal_delay: defaults.title_reveal_delay,
            page_title: "Power Hour".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = title.into();
        self
    }

    pub fn validate(&self) -> PowerHourResult<()> {
        if !self.clip_seconds.is_finite() || self.clip_seconds <= 0.0 {
            return Err(PowerHourError::config(format!(
                "clip_seconds must be positive, got {}",
                self.clip_seconds
            )));
        }
        for (name, value) in [
            ("pre_chorus", self.pre_chorus),
            ("default_start", self.default_start),
            ("title_reveal_delay", self.title_reveal_delay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PowerHourError::config(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self::from_defaults(&EmbedDefaults::default())
    }
}

/// One entry of the embedded playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Seconds into the video where playback starts.
    pub start: f64,
}

#[derive(Debug, Serialize)]
struct PlaylistData<'a> {
    clip_seconds: f64,
    title_reveal_delay: f64,
    items: &'a [EmbedItem],
}

/// Resolve the embedded playlist for `selection`.
///
/// Every item must be an external video id; local files cannot be embedded.
pub fn embed_items(
    selection: &SelectionPlan,
    options: &EmbedOptions,
) -> PowerHourResult<Vec<EmbedItem>> {
    selection
        .require_items()?
        .iter()
        .map(|item| match &item.source {
            ItemSource::Remote(id) => Ok(EmbedItem {
                id: id.clone(),
                title: item.title.clone(),
                start: item.cue.resolve_start(options.pre_chorus, options.default_start),
            }),
            ItemSource::Local(path) => Err(PowerHourError::input(format!(
                "item {} is a local file ({}); embedding needs video ids or URLs",
                item.order_index,
                path.display()
            ))),
        })
        .collect()
}

/// Fill the player template.
pub fn render_document(
    items: &[EmbedItem],
    options: &EmbedOptions,
    generated_at: DateTime<Utc>,
) -> PowerHourResult<String> {
    let data = PlaylistData {
        clip_seconds: options.clip_seconds,
        title_reveal_delay: options.title_reveal_delay,
        items,
    };
    let json = script_safe_json(&serde_json::to_string(&data)?);

    Ok(TEMPLATE
        .replace("{{PAGE_TITLE}}", &escape_html(&options.page_title))
        .replace("{{GENERATED_AT}}", &generated_at.to_rfc3339())
        .replace("{{ITEM_COUNT}}", &items.len().to_string())
        .replace("{{PLAYLIST_JSON}}", &json))
}

/// Write the player document for `selection` to `output`.
///
/// The file is written to a temporary sibling and moved into place, so a
/// failure never leaves a partial document at `output`.
pub fn generate(
    selection: &SelectionPlan,
    options: &EmbedOptions,
    output: &Path,
) -> PowerHourResult<PathBuf> {
    options.validate()?;
    let items = embed_items(selection, options)?;
    let html = render_document(&items, options, Utc::now())?;

    if output.is_dir() {
        return Err(PowerHourError::output(output, "is a directory"));
    }
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .map_err(|e| PowerHourError::output(output, format!("cannot create directory: {e}")))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".powerhour-")
        .suffix(".html.part")
        .tempfile_in(&parent)
        .map_err(|e| PowerHourError::output(output, e.to_string()))?;
    tmp.write_all(html.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| PowerHourError::output(output, e.to_string()))?;
    tmp.persist(output)
        .map_err(|e| PowerHourError::output(output, e.error.to_string()))?;

    tracing::info!(
        output = %output.display(),
        items = items.len(),
        clip_seconds = options.clip_seconds,
        "Embed document written"
    );
    Ok(output.to_path_buf())
}

/// JSON is valid JavaScript, but `</script>` or `<!--` inside a string would
/// end the script element early.
fn script_safe_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerhour_playlist_model::{Cue, PlaylistItem};

    fn remote_plan() -> SelectionPlan {
        let items = vec![
            PlaylistItem::remote("dQw4w9WgXcQ", 0)
                .with_title("Never Gonna")
                .with_cue(Cue {
                    start_secs: None,
                    chorus_secs: Some(43.0),
                }),
            PlaylistItem::remote("kJQP7kiw5Fk", 1).with_cue(Cue {
                start_secs: Some(60.0),
                chorus_secs: None,
            }),
            PlaylistItem::remote("9bZkp7q19f0", 2).with_cue(Cue {
                start_secs: None,
                chorus_secs: Some(4.0),
            }),
        ];
        SelectionPlan::new(items, 15.0, None)
    }

    #[test]
    fn test_item_starts_follow_cues() {
        let options = EmbedOptions {
            default_start: 5.0,
            ..EmbedOptions::default()
        };
        let items = embed_items(&remote_plan(), &options).unwrap();
        let starts: Vec<f64> = items.iter().map(|i| i.start).collect();
        assert_eq!(starts, vec![33.0, 60.0, 0.0]);
        assert_eq!(items[0].title.as_deref(), Some("Never Gonna"));
    }

    #[test]
    fn test_local_items_are_rejected() {
        let plan = SelectionPlan::new(vec![PlaylistItem::local("/v/a.mp4", 0)], 60.0, None);
        let err = embed_items(&plan, &EmbedOptions::default()).unwrap_err();
        assert!(matches!(err, PowerHourError::Input { .. }));
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let plan = SelectionPlan::new(vec![], 60.0, None);
        let err = embed_items(&plan, &EmbedOptions::default()).unwrap_err();
        assert!(matches!(err, PowerHourError::Input { .. }));
    }

    #[test]
    fn test_document_embeds_playlist() {
        let options = EmbedOptions {
            clip_seconds: 15.0,
            ..EmbedOptions::default()
        };
        let items = embed_items(&remote_plan(), &options).unwrap();
        let html = render_document(&items, &options, Utc::now()).unwrap();

        assert!(html.contains("<title>Power Hour</title>"));
        assert!(html.contains(r#""clip_seconds":15.0"#));
        assert!(html.contains(r#""id":"dQw4w9WgXcQ""#));
        assert!(html.contains(r#"content="3""#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_document_tick_guard_matches_step() {
        let html = render_document(&[], &EmbedOptions::default(), Utc::now()).unwrap();
        // Same rejection as `step`: non-finite and non-positive ticks.
        assert!(html.contains("if (!Number.isFinite(ev.dt) || ev.dt <= 0) return s;"));
        assert!(html.contains("const back = (i) => (i > 0 ?"));
        assert!(html.contains("case 'finished':\n                    return s;"));
    }

    #[test]
    fn test_titles_cannot_break_out_of_script() {
        let plan = SelectionPlan::new(
            vec![PlaylistItem::remote("dQw4w9WgXcQ", 0).with_title("</script><b>x</b>")],
            60.0,
            None,
        );
        let options = EmbedOptions::default().with_title("Rock & <Roll>");
        let items = embed_items(&plan, &options).unwrap();
        let html = render_document(&items, &options, Utc::now()).unwrap();

        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains(r"\u003c/script>\u003cb>x\u003c/b>"));
        assert!(html.contains("<title>Rock &amp; &lt;Roll&gt;</title>"));
    }

    #[test]
    fn test_invalid_options_are_config_errors() {
        let options = EmbedOptions {
            clip_seconds: 0.0,
            ..EmbedOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(PowerHourError::Config { .. })
        ));
    }
}
