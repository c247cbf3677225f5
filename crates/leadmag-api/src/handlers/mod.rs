pub mod document_get;
pub mod document_upload;
pub mod document_view;
pub mod leads;
