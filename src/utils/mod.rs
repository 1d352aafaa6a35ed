use url::Url;

use crate::captions::VideoId;

const VIDEO_ID_LEN: usize = 11;

fn is_bare_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract a video identifier from a watch/short/embed/shorts URL or a bare identifier
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();
    if is_bare_video_id(input) {
        return Some(VideoId::new(input));
    }

    let parsed = Url::parse(input).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let mut segments = parsed.path_segments()?.filter(|segment| !segment.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") | Some("shorts") | Some("live") | Some("v") => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    }?;

    is_bare_video_id(&candidate).then(|| VideoId::new(candidate))
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Check if the current environment has required tools
pub async fn check_dependencies(program: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(program).await {
        missing.push(format!("{} - needed for the external-tool caption fallback", program));
    }

    missing
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
