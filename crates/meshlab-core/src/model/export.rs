/// Base aspect/resolution of an export.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    #[default]
    Landscape,
    Square,
    Portrait,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [
        ExportFormat::Landscape,
        ExportFormat::Square,
        ExportFormat::Portrait,
    ];

    /// Resolution at multiplier 1.
    pub fn base_size(self) -> (u32, u32) {
        match self {
            ExportFormat::Landscape => (1920, 1080),
            ExportFormat::Square => (1080, 1080),
            ExportFormat::Portrait => (1080, 1920),
        }
    }

    /// Lowercase name used in export filenames.
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Landscape => "landscape",
            ExportFormat::Square => "square",
            ExportFormat::Portrait => "portrait",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ExportFormat::Landscape => ExportFormat::Square,
            ExportFormat::Square => ExportFormat::Portrait,
            ExportFormat::Portrait => ExportFormat::Landscape,
        }
    }
}

/// Fixed video lengths offered by the exporter.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExportDuration {
    #[default]
    Five,
    Ten,
    Fifteen,
}

impl ExportDuration {
    pub fn seconds(self) -> u32 {
        match self {
            ExportDuration::Five => 5,
            ExportDuration::Ten => 10,
            ExportDuration::Fifteen => 15,
        }
    }

    pub fn next(self) -> Self {
        match self {
            ExportDuration::Five => ExportDuration::Ten,
            ExportDuration::Ten => ExportDuration::Fifteen,
            ExportDuration::Fifteen => ExportDuration::Five,
        }
    }
}

pub const MIN_MULTIPLIER: u32 = 1;
pub const MAX_MULTIPLIER: u32 = 4;

/// Export settings. Session-local, never written to a scene document.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub multiplier: u32,
    pub duration: ExportDuration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Landscape,
            multiplier: 1,
            duration: ExportDuration::Five,
        }
    }
}

impl ExportConfig {
    /// Output resolution: base size × multiplier.
    pub fn target_size(&self) -> (u32, u32) {
        let (w, h) = self.format.base_size();
        let m = self.multiplier.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
        (w * m, h * m)
    }

    pub fn apply(&mut self, patch: &ExportPatch) {
        if let Some(f) = patch.format {
            self.format = f;
        }
        if let Some(m) = patch.multiplier {
            self.multiplier = m.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
        }
        if let Some(d) = patch.duration {
            self.duration = d;
        }
    }
}

/// Partial update for [`ExportConfig`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ExportPatch {
    pub format: Option<ExportFormat>,
    pub multiplier: Option<u32>,
    pub duration: Option<ExportDuration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_is_clamped() {
        let mut c = ExportConfig::default();
        c.apply(&ExportPatch {
            multiplier: Some(9),
            ..ExportPatch::default()
        });
        assert_eq!(c.multiplier, 4);
        c.apply(&ExportPatch {
            multiplier: Some(0),
            ..ExportPatch::default()
        });
        assert_eq!(c.multiplier, 1);
    }

    #[test]
    fn target_size_scales_base() {
        let c = ExportConfig {
            format: ExportFormat::Portrait,
            multiplier: 3,
            duration: ExportDuration::Ten,
        };
        assert_eq!(c.target_size(), (3240, 5760));
    }
}
