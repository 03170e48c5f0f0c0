use thiserror::Error;

pub type Result<T> = std::result::Result<T, SurvivalError>;

#[derive(Error, Debug)]
pub enum SurvivalError {
    #[error("dimensions don't match: {message}")]
    InvalidDimensions { message: String },

    #[error("survival data is broken: {message}")]
    InvalidSurvivalData { message: String },

    #[error("bad parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    #[error("numerical issues: {message}")]
    NumericalError { message: String },

    #[error("no observations to fit - need at least one subject")]
    EmptyObservations,

    #[error("need at least {required} groups to compare, got {actual}")]
    InsufficientGroups { required: usize, actual: usize },

    #[error("column `{column}` not found in table header")]
    MissingColumn { column: String },

    #[error("gene `{gene}` not found in expression matrix")]
    UnknownGene { gene: String },

    #[error("can't parse {what} from `{value}` (row {row})")]
    Parse { what: String, value: String, row: usize },

    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv read failed: {0}")]
    Csv(#[from] csv::Error),
}

impl SurvivalError {
    pub fn invalid_dimensions(message: impl Into<String>) -> Self {
        Self::InvalidDimensions { message: message.into() }
    }

    pub fn invalid_survival_data(message: impl Into<String>) -> Self {
        Self::InvalidSurvivalData { message: message.into() }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn numerical_error(message: impl Into<String>) -> Self {
        Self::NumericalError { message: message.into() }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn { column: column.into() }
    }

    pub fn unknown_gene(gene: impl Into<String>) -> Self {
        Self::UnknownGene { gene: gene.into() }
    }

    pub fn parse(what: impl Into<String>, value: impl Into<String>, row: usize) -> Self {
        Self::Parse {
            what: what.into(),
            value: value.into(),
            row,
        }
    }
}
