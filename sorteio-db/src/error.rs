use thiserror::Error;

/// Falhas do núcleo. Todas são recuperáveis na camada de apresentação.
#[derive(Debug, Error)]
pub enum LotteryError {
    #[error("nenhuma fonte de dados disponível: {0}")]
    SourceUnavailable(String),

    #[error("parâmetro inválido: {0}")]
    InvalidParameter(String),

    #[error("registro malformado na linha {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("sorteio inválido: {0}")]
    InvalidDraw(String),

    #[error("não foi possível gerar números: {0}")]
    GenerationFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, LotteryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LotteryError::MalformedRecord {
            line: 12,
            reason: "bola 3 vazia".to_string(),
        };
        assert_eq!(err.to_string(), "registro malformado na linha 12: bola 3 vazia");
    }
}
