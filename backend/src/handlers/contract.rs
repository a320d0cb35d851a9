//! Farmer/HHM contract handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::Contract;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::contract::{ContractFilter, CreateContractInput, RespondContractInput};
use crate::services::ContractService;
use crate::AppState;

/// Farmer sends a contract request
pub async fn create_contract(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateContractInput>,
) -> AppResult<(StatusCode, Json<Contract>)> {
    let service = ContractService::new(state.db.clone(), &state.config);
    let contract = service.create(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

/// Sent contracts for farmers, received contracts for HHMs
pub async fn list_contracts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ContractFilter>,
) -> AppResult<Json<Vec<Contract>>> {
    let service = ContractService::new(state.db.clone(), &state.config);
    let contracts = service.list(&current_user.0, &filter).await?;
    Ok(Json(contracts))
}

pub async fn get_contract(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(contract_id): Path<Uuid>,
) -> AppResult<Json<Contract>> {
    let service = ContractService::new(state.db.clone(), &state.config);
    let contract = service.get(&current_user.0, contract_id).await?;
    Ok(Json(contract))
}

/// HHM accepts or rejects
pub async fn respond_contract(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(contract_id): Path<Uuid>,
    Json(input): Json<RespondContractInput>,
) -> AppResult<Json<Contract>> {
    let service = ContractService::new(state.db.clone(), &state.config);
    let contract = service.respond(&current_user.0, contract_id, input).await?;
    Ok(Json(contract))
}
