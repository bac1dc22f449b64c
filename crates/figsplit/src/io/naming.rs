use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::{
    caption::FigureKind,
    error::{FigSplitError, Result},
};

static SUBFIGURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)_fig_(\d+)(?:_(\d+))?\.jpg$").expect("valid sub-figure name regex")
});
static EXTRACTED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+)-(figure|table)(\d+)-(\d+)\.(?:png|jpe?g)$")
        .expect("valid extracted figure name regex")
});

/// File name of a persisted (sub-)figure.
///
/// `<paper>_fig_<figure>_<subfigure>.jpg` for crops (subfigure counted from
/// 1), `<paper>_fig_<figure>.jpg` for a figure kept whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubfigureName {
    pub paper: String,
    pub figure: u32,
    pub subfigure: Option<u32>,
}

impl SubfigureName {
    pub fn whole(paper: impl Into<String>, figure: u32) -> Self {
        Self {
            paper: paper.into(),
            figure,
            subfigure: None,
        }
    }

    pub fn crop(paper: impl Into<String>, figure: u32, subfigure: u32) -> Self {
        Self {
            paper: paper.into(),
            figure,
            subfigure: Some(subfigure),
        }
    }

    /// Parse a file name (not a full path).
    pub fn parse(file_name: &str) -> Result<Self> {
        let captures = SUBFIGURE_NAME.captures(file_name).ok_or_else(|| {
            FigSplitError::InvalidInput(format!("not a sub-figure file name: {file_name}"))
        })?;
        let number = |i: usize| -> Result<u32> {
            captures[i].parse().map_err(|_| {
                FigSplitError::InvalidInput(format!("figure number too large in {file_name}"))
            })
        };

        Ok(Self {
            paper: captures[1].to_string(),
            figure: number(2)?,
            subfigure: match captures.get(3) {
                Some(_) => Some(number(3)?),
                None => None,
            },
        })
    }
}

impl fmt::Display for SubfigureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subfigure {
            Some(sub) => write!(f, "{}_fig_{}_{}.jpg", self.paper, self.figure, sub),
            None => write!(f, "{}_fig_{}.jpg", self.paper, self.figure),
        }
    }
}

impl FromStr for SubfigureName {
    type Err = FigSplitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Name pdffigures2 gives a rendered figure: `<paper>-Figure<N>-<k>.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractedFigureName {
    pub paper: String,
    pub kind: FigureKind,
    pub number: u32,
    pub variant: u32,
}

impl ExtractedFigureName {
    pub fn parse(file_name: &str) -> Result<Self> {
        let invalid = || FigSplitError::InvalidInput(format!("not an extracted figure file name: {file_name}"));
        let captures = EXTRACTED_NAME.captures(file_name).ok_or_else(invalid)?;

        Ok(Self {
            paper: captures[1].to_string(),
            kind: captures[2].parse().map_err(|_| invalid())?,
            number: captures[3].parse().map_err(|_| invalid())?,
            variant: captures[4].parse().map_err(|_| invalid())?,
        })
    }

    pub fn is_table(&self) -> bool {
        self.kind == FigureKind::Table
    }
}

impl FromStr for ExtractedFigureName {
    type Err = FigSplitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
