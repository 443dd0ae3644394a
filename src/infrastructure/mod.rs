pub mod forms_client;
pub mod tabular;

pub use forms_client::{CreatedForm, FormsApi, FormsClient};
pub use tabular::{load_workbook, Cell, SourceSet, TabularSource};
