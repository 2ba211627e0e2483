use souvenir_core::episode::Episode;

/// One `[<type>] <content>` line per episode, in the order given.
pub fn build(episodes: &[Episode]) -> String {
    episodes.iter().map(Episode::transcript_line).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use souvenir_core::episode::EpisodeType;

    #[test]
    fn joins_transcript_lines_in_order() {
        let episodes = vec![
            Episode::new("s1", EpisodeType::Observation, "saw a rabbit"),
            Episode::new("s1", EpisodeType::Decision, "named it Hoppy"),
        ];
        let transcript = build(&episodes);
        assert_eq!(transcript, "[observation] saw a rabbit\n[decision] named it Hoppy");
    }
}
