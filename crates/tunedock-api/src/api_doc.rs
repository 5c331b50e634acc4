//! OpenAPI documentation, served at /api-docs/openapi.json and browsable
//! through RapiDoc at /rapidoc.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use tunedock_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tunedock API",
        version = "0.1.0",
        description = "Single-owner audio conversion service. Submit a page or media URL, poll the job until it completes, then stream or download the finished MP3 from the folder-organized library."
    ),
    paths(
        // Jobs
        handlers::convert::convert,
        handlers::status::get_status,
        handlers::status::list_status,
        // Library
        handlers::library::list_files,
        handlers::library::get_stats,
        handlers::download::download_file,
        handlers::download::play_file,
        handlers::file_delete::delete_file,
        // Folders
        handlers::folders::list_folders,
        handlers::folders::create_folder,
        handlers::folders::delete_folder,
        // Owner
        handlers::owner::get_owner,
        handlers::owner::reassign_owner,
    ),
    components(
        schemas(
            // Core models
            models::JobResponse,
            models::JobStatus,
            models::BitrateTier,
            models::LibraryView,
            models::FolderSummary,
            models::LibraryStats,
            // Request/response bodies
            handlers::convert::ConvertRequest,
            handlers::convert::ConvertAccepted,
            handlers::library::FilesQuery,
            handlers::folders::CreateFolderRequest,
            handlers::folders::FolderCreated,
            handlers::folders::FolderDeleted,
            handlers::file_delete::FileDeleted,
            handlers::owner::OwnerResponse,
            handlers::owner::ReassignOwnerRequest,
            handlers::owner::OwnerReassigned,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "jobs", description = "Conversion job submission and status polling"),
        (name = "library", description = "Completed track listing, playback, download, and deletion"),
        (name = "folders", description = "Folder listing and management"),
        (name = "owner", description = "Owner identity inspection and reassignment")
    )
)]
pub struct ApiDoc;
