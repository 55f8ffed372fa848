//! Synthetic tone played while the visualizer runs on generated frames.

/// Glicol composition for a steady sine tone
pub fn tone_composition(frequency_hz: f32, gain: f32) -> String {
    format!("o: sin {:.1} >> mul {:.3}\n", frequency_hz, gain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_composition() {
        assert_eq!(tone_composition(60.0, 0.1), "o: sin 60.0 >> mul 0.100\n");
    }
}
