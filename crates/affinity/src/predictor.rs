use crate::codec::IdentityCodec;
use ndarray::Array2;
use poppy_core::{PoppyError, PoppyResult, PredictionTable};

/// Turns a dense user × item matrix back into a user-keyed table.
pub struct DensePredictor;

impl DensePredictor {
    /// Rows follow the user codec order, columns the item codec order.
    pub fn table(
        users: &IdentityCodec,
        items: &IdentityCodec,
        matrix: &Array2<f64>,
    ) -> PoppyResult<PredictionTable> {
        if matrix.dim() != (users.len(), items.len()) {
            return Err(PoppyError::Shape(format!(
                "prediction matrix is {:?}, codecs describe ({}, {})",
                matrix.dim(),
                users.len(),
                items.len()
            )));
        }

        let mut table = PredictionTable::new(items.labels().to_vec());
        for (user_id, row) in users.labels().iter().zip(matrix.rows()) {
            table.push_row(user_id.as_str(), row.to_vec())?;
        }
        Ok(table)
    }
}
