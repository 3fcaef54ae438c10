use apodize::hanning_iter;

const SMOOTHING_TAPS: usize = 7;
const FLAT_ENVELOPE: f64 = 1e-9;

/// Rango y prior del estimador de tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoRange {
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub start_bpm: f64,
}

/// Envolvente de onsets: diferencia rectificada del log-mel promediada sobre
/// bandas, suavizada y centrada en cero.
pub fn onset_envelope(log_mel: &[Vec<f64>]) -> Vec<f64> {
    if log_mel.is_empty() {
        return Vec::new();
    }

    let mut envelope = Vec::with_capacity(log_mel.len());
    envelope.push(0.0);
    for pair in log_mel.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let bands = cur.len().max(1) as f64;
        let flux: f64 = cur.iter().zip(prev).map(|(c, p)| (c - p).max(0.0)).sum();
        envelope.push(flux / bands);
    }

    let mut smoothed = smooth(&envelope);
    let mean = smoothed.iter().sum::<f64>() / smoothed.len() as f64;
    smoothed.iter_mut().for_each(|v| *v -= mean);
    smoothed
}

fn smooth(signal: &[f64]) -> Vec<f64> {
    let kernel: Vec<f64> = hanning_iter(SMOOTHING_TAPS).collect();
    let norm: f64 = kernel.iter().sum();
    let half = SMOOTHING_TAPS / 2;

    (0..signal.len())
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    let idx = (i + j).checked_sub(half)?;
                    signal.get(idx).map(|s| s * w)
                })
                .sum::<f64>()
                / norm
        })
        .collect()
}

/// Tempo global en BPM por autocorrelación de la envolvente ponderada con un
/// prior log-normal. Devuelve 0.0 si la envolvente es plana o demasiado corta.
pub fn estimate_tempo(envelope: &[f64], frame_rate: f64, range: TempoRange) -> f64 {
    let min_lag = ((60.0 * frame_rate / range.max_bpm).floor() as usize).max(1);
    let max_lag = (60.0 * frame_rate / range.min_bpm).ceil() as usize;
    if envelope.len() <= min_lag + 1 {
        return 0.0;
    }
    let max_lag = max_lag.min(envelope.len() - 1);

    let energy: f64 = envelope.iter().map(|v| v * v).sum();
    if energy <= FLAT_ENVELOPE {
        return 0.0;
    }

    let bpm_of = |lag: f64| 60.0 * frame_rate / lag;
    let score = |lag: usize| {
        let ac: f64 = envelope.iter().zip(&envelope[lag..]).map(|(a, b)| a * b).sum::<f64>() / energy;
        let octaves = (bpm_of(lag as f64) / range.start_bpm).log2();
        ac * (-0.5 * octaves * octaves).exp()
    };

    let Some((best_lag, best)) = (min_lag..=max_lag)
        .map(|lag| (lag, score(lag)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
    else {
        return 0.0;
    };
    if best <= 0.0 {
        return 0.0;
    }

    // refinamiento parabólico alrededor del máximo
    let mut lag = best_lag as f64;
    if best_lag > min_lag && best_lag < max_lag {
        let (y0, y1, y2) = (score(best_lag - 1), best, score(best_lag + 1));
        let denom = y0 - 2.0 * y1 + y2;
        if denom.abs() > f64::EPSILON {
            lag += (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5);
        }
    }

    bpm_of(lag)
}
