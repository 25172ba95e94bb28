use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct BeamSearchParams {
    pub num_beams: usize,
    /// minimum length of the whole sequence, prompt included
    pub min_length: usize,
    /// maximum length of the whole sequence, prompt included
    pub max_length: usize,
    /// n-grams of this size never appear twice, 0 disables the check
    pub no_repeat_ngram_size: usize,
    pub eos_token_id: u32,
    /// stop once `num_beams` hypotheses are finished
    pub early_stopping: bool,
    pub length_penalty: f32,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    /// sum of log probabilities of the generated tokens
    log_prob: f32,
}

impl Hypothesis {
    fn score(&self, length_penalty: f32) -> f32 {
        self.log_prob / (self.tokens.len() as f32).powf(length_penalty)
    }
}

/// Tokens that would complete an n-gram already present in `tokens`.
pub(crate) fn banned_ngram_tokens(tokens: &[u32], ngram_size: usize) -> Vec<u32> {
    if ngram_size == 0 || tokens.len() + 1 < ngram_size {
        return vec![];
    }

    let prefix_len = ngram_size - 1;
    let prefix = &tokens[tokens.len() - prefix_len..];

    tokens
        .windows(ngram_size)
        .filter(|window| &window[..prefix_len] == prefix)
        .map(|window| window[prefix_len])
        .collect()
}

/// Run beam search from `prompt`.
///
/// `next_log_probs` receives a full sequence and returns the log probabilities
/// of every vocabulary entry for the next position. The returned sequence
/// starts with the prompt and never contains the eos token.
pub fn beam_search<F>(
    prompt: &[u32],
    params: &BeamSearchParams,
    mut next_log_probs: F,
) -> anyhow::Result<Vec<u32>>
where
    F: FnMut(&[u32]) -> anyhow::Result<Vec<f32>>,
{
    anyhow::ensure!(params.num_beams > 0, "num_beams must be positive");
    anyhow::ensure!(!prompt.is_empty(), "prompt must contain at least one token");

    let mut beams = vec![Hypothesis {
        tokens: prompt.to_vec(),
        log_prob: 0.0,
    }];
    let mut finished: Vec<Hypothesis> = vec![];
    let candidates_per_step = params.num_beams * 2;

    let mut cur_len = prompt.len();
    while cur_len < params.max_length && !beams.is_empty() {
        // (beam index, token, accumulated log prob)
        let mut candidates: Vec<(usize, u32, f32)> = vec![];

        for (beam_idx, beam) in beams.iter().enumerate() {
            let mut log_probs = next_log_probs(&beam.tokens)?;

            if cur_len < params.min_length {
                if let Some(v) = log_probs.get_mut(params.eos_token_id as usize) {
                    *v = f32::NEG_INFINITY;
                }
            }
            for token in banned_ngram_tokens(&beam.tokens, params.no_repeat_ngram_size) {
                if let Some(v) = log_probs.get_mut(token as usize) {
                    *v = f32::NEG_INFINITY;
                }
            }

            let mut ranked: Vec<(u32, f32)> = log_probs
                .into_iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(token, v)| (token as u32, v))
                .collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            ranked.truncate(candidates_per_step);

            candidates.extend(
                ranked
                    .into_iter()
                    .map(|(token, v)| (beam_idx, token, beam.log_prob + v)),
            );
        }

        candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

        let mut next_beams = vec![];
        for (rank, (beam_idx, token, log_prob)) in candidates.into_iter().enumerate() {
            if token == params.eos_token_id {
                // eos only counts when it ranks among the best beams
                if rank < params.num_beams {
                    finished.push(Hypothesis {
                        tokens: beams[beam_idx].tokens.clone(),
                        log_prob,
                    });
                }
                continue;
            }

            let mut tokens = beams[beam_idx].tokens.clone();
            tokens.push(token);
            next_beams.push(Hypothesis { tokens, log_prob });

            if next_beams.len() == params.num_beams {
                break;
            }
        }

        beams = next_beams;
        cur_len += 1;

        if params.early_stopping && finished.len() >= params.num_beams {
            break;
        }
    }

    if finished.len() < params.num_beams {
        finished.extend(beams);
    }

    finished
        .into_iter()
        .max_by(|a, b| {
            a.score(params.length_penalty)
                .partial_cmp(&b.score(params.length_penalty))
                .unwrap_or(Ordering::Equal)
        })
        .map(|v| v.tokens)
        .ok_or(anyhow::anyhow!("beam search produced no hypothesis"))
}
