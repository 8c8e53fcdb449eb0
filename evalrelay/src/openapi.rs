//! OpenAPI documentation for the relay API.

use utoipa::OpenApi;

use crate::api::{self, models};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "evalrelay API",
        description = "Relays evaluation uploads and instruction-file edits to the Rukh evaluation service."
    ),
    paths(
        api::handlers::ask::ask,
        api::handlers::instruction_file::get_instruction_file,
        api::handlers::instruction_file::update_instruction_file,
    ),
    components(schemas(
        models::ErrorResponse,
        models::instruction_file::InstructionFileContent,
        models::instruction_file::InstructionFileUpdate,
    )),
    tags(
        (name = "ask", description = "Ask the evaluation service about a file"),
        (name = "instruction-file", description = "Read and overwrite the instruction file"),
    )
)]
pub struct ApiDoc;
